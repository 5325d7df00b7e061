use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::super::{AppResult, AppState};
use crate::auth::AuthUser;
use crate::models::Review;
use crate::services::NewReview;

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(request_id): Path<String>,
    Json(input): Json<NewReview>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = state.ctx.reviews().create(&user, &request_id, input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
