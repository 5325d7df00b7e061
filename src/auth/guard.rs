//! Request extractors for signed-in users.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use serde::Deserialize;

use super::AuthError;
use crate::models::User;
use crate::server::{AppError, AppState};

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Token from the `?token=` query parameter.
fn query_token(uri: &Uri) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

/// A signed-in, non-banned user.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let user = state.ctx.auth().authenticate(&token).await?;
        Ok(Self(user))
    }
}

/// A signed-in user on a WebSocket handshake. Browsers cannot set headers on
/// the upgrade request, so `?token=` is accepted here and nowhere else.
pub struct SocketUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SocketUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| query_token(&parts.uri))
            .ok_or(AuthError::MissingToken)?;
        let user = state.ctx.auth().authenticate(&token).await?;
        Ok(Self(user))
    }
}

/// A signed-in admin.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AuthError::AdminRequired.into());
        }
        Ok(Self(user))
    }
}

/// Optional viewer for public endpoints. A missing token is anonymous, but a
/// bad token is still rejected.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers) {
            Some(token) => Ok(Self(Some(state.ctx.auth().authenticate(&token).await?))),
            None => Ok(Self(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_reads_header_only() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  abc "));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_query_token() {
        let uri: Uri = "/ws?token=abc".parse().unwrap();
        assert_eq!(query_token(&uri).as_deref(), Some("abc"));

        let blank: Uri = "/ws?token=".parse().unwrap();
        assert_eq!(query_token(&blank), None);

        let none: Uri = "/ws".parse().unwrap();
        assert_eq!(query_token(&none), None);
    }
}
