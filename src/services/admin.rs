//! Admin dashboard: platform statistics and moderation.
//!
//! Handler-facing methods take the acting admin so self-targeting can be
//! refused. The `*_by_email` variants skip that check and back the CLI,
//! which runs with direct database access.

use chrono::{Duration, Utc};
use serde::Serialize;

use super::{ServiceContext, ServiceError, ServiceResult, StatsCache};
use crate::models::{normalize_email, AccountView, Role, User};
use crate::repository::util::page_bounds;
use crate::repository::PlatformStats;

const MAX_PAGE: i64 = 200;
/// Window for the "new users" figure.
const NEW_USER_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<AccountView>,
    pub total: i64,
}

pub struct AdminService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AdminService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn stats(&self) -> ServiceResult<PlatformStats> {
        if let Some(stats) = self.ctx.stats_cache.get_stats() {
            return Ok(stats);
        }

        let stats = self
            .ctx
            .db
            .stats()
            .collect(Utc::now() - Duration::days(NEW_USER_DAYS))
            .await?;
        self.ctx.stats_cache.set_stats(stats.clone());
        Ok(stats)
    }

    pub async fn list_users(
        &self,
        query: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<UserPage> {
        let (limit, offset) = page_bounds(limit, offset, MAX_PAGE);
        let repo = self.ctx.db.users();
        let users = repo.list(query, limit, offset).await?;

        let key = StatsCache::user_count_key(query);
        let total = match self.ctx.stats_cache.get_user_count(&key) {
            Some(total) => total,
            None => {
                let total = repo.count(query).await?;
                self.ctx.stats_cache.set_user_count(key, total);
                total
            }
        };

        Ok(UserPage {
            users: users.iter().map(AccountView::from).collect(),
            total,
        })
    }

    pub async fn set_banned(
        &self,
        actor: &User,
        id: &str,
        banned: bool,
    ) -> ServiceResult<AccountView> {
        if actor.id == id {
            return Err(ServiceError::forbidden("you cannot ban yourself"));
        }
        let user = self.load(id).await?;
        self.apply_ban(user, banned).await
    }

    pub async fn set_role(&self, actor: &User, id: &str, role: Role) -> ServiceResult<AccountView> {
        if actor.id == id {
            return Err(ServiceError::forbidden("you cannot change your own role"));
        }
        let user = self.load(id).await?;
        self.apply_role(user, role).await
    }

    pub async fn set_banned_by_email(
        &self,
        email: &str,
        banned: bool,
    ) -> ServiceResult<AccountView> {
        let user = self.load_by_email(email).await?;
        self.apply_ban(user, banned).await
    }

    pub async fn set_role_by_email(&self, email: &str, role: Role) -> ServiceResult<AccountView> {
        let user = self.load_by_email(email).await?;
        self.apply_role(user, role).await
    }

    /// Remove a request with its applications, messages and reviews, then
    /// recompute the ratings of everyone reviewed on it.
    pub async fn delete_request(&self, actor: &User, id: &str) -> ServiceResult<()> {
        let reviewees = self
            .ctx
            .db
            .requests()
            .delete(id)
            .await?
            .ok_or(ServiceError::NotFound("request"))?;

        let users = self.ctx.db.users();
        for reviewee in &reviewees {
            users.update_rating(reviewee).await?;
        }
        self.ctx.stats_cache.invalidate();
        tracing::info!("Admin {} deleted request {}", actor.id, id);
        Ok(())
    }

    async fn load(&self, id: &str) -> ServiceResult<User> {
        self.ctx
            .db
            .users()
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }

    async fn load_by_email(&self, email: &str) -> ServiceResult<User> {
        self.ctx
            .db
            .users()
            .get_by_email(&normalize_email(email))
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }

    async fn apply_ban(&self, mut user: User, banned: bool) -> ServiceResult<AccountView> {
        self.ctx.db.users().set_banned(&user.id, banned).await?;
        if banned {
            let revoked = self.ctx.db.sessions().delete_for_user(&user.id).await?;
            tracing::info!("Banned user {} ({} sessions revoked)", user.id, revoked);
        } else {
            tracing::info!("Unbanned user {}", user.id);
        }
        self.ctx.stats_cache.invalidate();
        user.banned = banned;
        Ok(AccountView::from(&user))
    }

    async fn apply_role(&self, mut user: User, role: Role) -> ServiceResult<AccountView> {
        self.ctx.db.users().set_role(&user.id, role).await?;
        self.ctx.stats_cache.invalidate();
        tracing::info!("User {} is now {}", user.id, role.as_str());
        user.role = role;
        Ok(AccountView::from(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, RegisterInput};
    use crate::models::RequestStatus;
    use crate::services::test_support::{
        admin, assigned_request, open_request, test_services, user,
    };
    use crate::services::NewReview;

    #[tokio::test]
    async fn test_stats_are_cached_until_invalidated() {
        let (ctx, _dir) = test_services().await;
        let ana = user(&ctx, "Ana").await;
        let root = admin(&ctx, "Root").await;
        open_request(&ctx, &ana).await;

        let stats = ctx.admin().stats().await.unwrap();
        assert_eq!(stats.users.total, 2);
        assert_eq!(stats.users.admins, 1);
        assert_eq!(stats.users.new_since, 2);
        assert_eq!(stats.requests.by_status[RequestStatus::Open.as_str()], 1);

        // Served from cache: a new request is not visible yet.
        open_request(&ctx, &ana).await;
        assert_eq!(ctx.admin().stats().await.unwrap().requests.total, 1);

        ctx.admin().set_banned(&root, &ana.id, true).await.unwrap();
        let fresh = ctx.admin().stats().await.unwrap();
        assert_eq!(fresh.requests.total, 2);
        assert_eq!(fresh.users.banned, 1);
    }

    #[tokio::test]
    async fn test_ban_revokes_sessions() {
        let (ctx, _dir) = test_services().await;
        let root = admin(&ctx, "Root").await;
        let session = ctx
            .auth()
            .register(RegisterInput {
                name: "Bia".into(),
                email: "bia@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        let bia_id = session.user.public.id.clone();

        assert!(matches!(
            ctx.admin().set_banned(&root, &root.id, true).await,
            Err(ServiceError::Forbidden(_))
        ));

        let view = ctx.admin().set_banned(&root, &bia_id, true).await.unwrap();
        assert!(view.banned);
        assert!(matches!(
            ctx.auth().authenticate(&session.token).await,
            Err(ServiceError::Auth(AuthError::InvalidSession))
        ));

        ctx.admin().set_banned_by_email("BIA@example.com", false).await.unwrap();
        assert!(ctx.auth().login("bia@example.com", "password123").await.is_ok());
    }

    #[tokio::test]
    async fn test_roles_and_user_listing() {
        let (ctx, _dir) = test_services().await;
        let root = admin(&ctx, "Root").await;
        let ana = user(&ctx, "Ana").await;
        user(&ctx, "Bia").await;

        assert!(matches!(
            ctx.admin().set_role(&root, &root.id, Role::User).await,
            Err(ServiceError::Forbidden(_))
        ));
        let promoted = ctx.admin().set_role(&root, &ana.id, Role::Admin).await.unwrap();
        assert_eq!(promoted.public.role, Role::Admin);
        assert!(matches!(
            ctx.admin().set_role_by_email("nobody@example.com", Role::Admin).await,
            Err(ServiceError::NotFound("user"))
        ));

        let page = ctx.admin().list_users(None, Some(2), None).await.unwrap();
        assert_eq!(page.users.len(), 2);
        assert_eq!(page.total, 3);

        let search = ctx.admin().list_users(Some("ana"), None, None).await.unwrap();
        assert_eq!(search.total, 1);
        assert_eq!(search.users[0].email, "ana@example.com");
    }

    #[tokio::test]
    async fn test_delete_request() {
        let (ctx, _dir) = test_services().await;
        let root = admin(&ctx, "Root").await;
        let ana = user(&ctx, "Ana").await;
        let req = open_request(&ctx, &ana).await;

        ctx.admin().delete_request(&root, &req.id).await.unwrap();
        assert!(ctx.db.requests().get(&req.id).await.unwrap().is_none());
        assert!(matches!(
            ctx.admin().delete_request(&root, &req.id).await,
            Err(ServiceError::NotFound("request"))
        ));
    }

    #[tokio::test]
    async fn test_delete_request_recomputes_ratings() {
        let (ctx, _dir) = test_services().await;
        let root = admin(&ctx, "Root").await;
        let ana = user(&ctx, "Ana").await;
        let bia = user(&ctx, "Bia").await;

        // One earlier review of Bia that must survive the deletion.
        let kept = assigned_request(&ctx, &ana, &bia).await;
        ctx.requests().complete(&ana, &kept.id).await.unwrap();
        ctx.reviews()
            .create(&ana, &kept.id, NewReview { rating: 5, comment: None })
            .await
            .unwrap();

        let req = assigned_request(&ctx, &ana, &bia).await;
        ctx.requests().complete(&bia, &req.id).await.unwrap();
        ctx.reviews()
            .create(&ana, &req.id, NewReview { rating: 1, comment: None })
            .await
            .unwrap();
        ctx.reviews()
            .create(&bia, &req.id, NewReview { rating: 4, comment: None })
            .await
            .unwrap();

        let before = ctx.db.users().get(&bia.id).await.unwrap().unwrap();
        assert_eq!(before.rating_count, 2);
        assert_eq!(before.rating_avg, 3.0);

        ctx.admin().delete_request(&root, &req.id).await.unwrap();

        let bia_after = ctx.db.users().get(&bia.id).await.unwrap().unwrap();
        assert_eq!(bia_after.rating_count, 1);
        assert_eq!(bia_after.rating_avg, 5.0);

        let ana_after = ctx.db.users().get(&ana.id).await.unwrap().unwrap();
        assert_eq!(ana_after.rating_count, 0);
        assert_eq!(ana_after.rating_avg, 0.0);
    }
}
