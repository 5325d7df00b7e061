//! Notification inbox endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::super::{AppResult, AppState};
use crate::auth::AuthUser;
use crate::models::Notification;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<Notification>>> {
    let items = state
        .ctx
        .notifications()
        .list(&user, params.unread, params.limit)
        .await?;
    Ok(Json(items))
}

pub async fn unread_count(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Value>> {
    let count = state.ctx.notifications().unread_count(&user).await?;
    Ok(Json(json!({ "count": count })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.ctx.notifications().mark_read(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Value>> {
    let updated = state.ctx.notifications().mark_all_read(&user).await?;
    Ok(Json(json!({ "updated": updated })))
}
