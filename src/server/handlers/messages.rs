//! Per-request chat endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::super::{AppResult, AppState};
use crate::auth::AuthUser;
use crate::models::Message;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    /// Only messages strictly newer than this instant.
    pub after: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SendInput {
    pub body: String,
}

pub async fn history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(request_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<Vec<Message>>> {
    let messages = state
        .ctx
        .chat()
        .history(&user, &request_id, params.after, params.limit)
        .await?;
    Ok(Json(messages))
}

pub async fn send(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(request_id): Path<String>,
    Json(input): Json<SendInput>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let message = state.ctx.chat().send(&user, &request_id, &input.body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
