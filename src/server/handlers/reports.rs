use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::super::{AppResult, AppState};
use crate::auth::AuthUser;
use crate::models::Report;
use crate::services::NewReport;

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<NewReport>,
) -> AppResult<(StatusCode, Json<Report>)> {
    let report = state.ctx.reports().create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(report)))
}
