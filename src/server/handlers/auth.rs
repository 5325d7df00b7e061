//! Registration, login and session endpoints.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use super::super::{AppResult, AppState};
use crate::auth::{bearer_token, AuthSession, AuthUser, RegisterInput};
use crate::models::AccountView;

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<AuthSession>)> {
    let session = state.ctx.auth().register(input).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<AuthSession>> {
    let session = state.ctx.auth().login(&input.email, &input.password).await?;
    Ok(Json(session))
}

pub async fn logout(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    if let Some(token) = bearer_token(&headers) {
        state.ctx.auth().logout(&token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(AuthUser(user): AuthUser) -> Json<AccountView> {
    Json(AccountView::from(&user))
}
