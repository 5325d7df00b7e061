//! Application endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::super::{AppResult, AppState};
use crate::auth::AuthUser;
use crate::models::Application;

#[derive(Debug, Default, Deserialize)]
pub struct ApplyInput {
    #[serde(default)]
    pub message: Option<String>,
}

pub async fn apply(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(request_id): Path<String>,
    Json(input): Json<ApplyInput>,
) -> AppResult<(StatusCode, Json<Application>)> {
    let app = state
        .ctx
        .applications()
        .apply(&user, &request_id, input.message)
        .await?;
    Ok((StatusCode::CREATED, Json(app)))
}

pub async fn mine(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<Application>>> {
    Ok(Json(state.ctx.applications().list_mine(&user).await?))
}

pub async fn accept(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Application>> {
    Ok(Json(state.ctx.applications().accept(&user, &id).await?))
}

pub async fn decline(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Application>> {
    Ok(Json(state.ctx.applications().decline(&user, &id).await?))
}

pub async fn withdraw(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Application>> {
    Ok(Json(state.ctx.applications().withdraw(&user, &id).await?))
}
