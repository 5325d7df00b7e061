//! Account registration, login and session lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{generate_token, hash_password, hash_token, verify_password, AuthError};
use crate::models::{normalize_email, AccountView, User};
use crate::repository::util::is_unique_violation;
use crate::services::{validate, ServiceContext, ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A freshly issued bearer token and the account it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AccountView,
}

pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn register(&self, input: RegisterInput) -> ServiceResult<AuthSession> {
        let name = validate::text("name", &input.name, validate::NAME_LEN)?;
        let email = validate::email(&input.email)?;
        validate::password(&input.password)?;

        let users = self.ctx.db.users();
        if users.get_by_email(&email).await?.is_some() {
            return Err(ServiceError::conflict("email is already registered"));
        }

        let hash = hash_password(&input.password).map_err(ServiceError::Password)?;
        let user = User::new(name, &email, hash);
        match users.create(&user).await {
            Ok(()) => {}
            // Lost a race with a concurrent registration.
            Err(e) if is_unique_violation(&e) => {
                return Err(ServiceError::conflict("email is already registered"))
            }
            Err(e) => return Err(e.into()),
        }

        self.ctx.stats_cache.invalidate();
        tracing::info!("Registered user {} ({})", user.id, user.email);
        self.issue_session(&user).await
    }

    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<AuthSession> {
        let user = self
            .ctx
            .db
            .users()
            .get_by_email(&normalize_email(email))
            .await?
            .filter(|u| verify_password(password, &u.password_hash))
            .ok_or(AuthError::InvalidCredentials)?;

        if user.banned {
            return Err(AuthError::Banned.into());
        }

        self.issue_session(&user).await
    }

    /// Revoke a token. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> ServiceResult<()> {
        self.ctx.db.sessions().delete(&hash_token(token)).await?;
        Ok(())
    }

    /// Resolve a bearer token to an active, non-banned user.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<User> {
        let user_id = self
            .ctx
            .db
            .sessions()
            .get_user_id(&hash_token(token))
            .await?
            .ok_or(AuthError::InvalidSession)?;

        let user = self
            .ctx
            .db
            .users()
            .get(&user_id)
            .await?
            .ok_or(AuthError::InvalidSession)?;

        if user.banned {
            return Err(AuthError::Banned.into());
        }
        Ok(user)
    }

    pub async fn purge_expired(&self) -> ServiceResult<usize> {
        let purged = self.ctx.db.sessions().purge_expired().await?;
        if purged > 0 {
            tracing::info!("Purged {} expired sessions", purged);
        }
        Ok(purged)
    }

    async fn issue_session(&self, user: &User) -> ServiceResult<AuthSession> {
        let token = generate_token();
        let expires_at = Utc::now() + self.ctx.settings.session_ttl();
        self.ctx
            .db
            .sessions()
            .create(&hash_token(&token), &user.id, expires_at)
            .await?;

        Ok(AuthSession {
            token,
            expires_at,
            user: AccountView::from(user),
        })
    }
}
