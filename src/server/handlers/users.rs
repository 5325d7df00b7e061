//! Profile endpoints.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;

use super::super::{AppError, AppResult, AppState};
use super::helpers::{read_files, PageParams};
use crate::auth::AuthUser;
use crate::models::{AccountView, Review};
use crate::services::{PublicProfile, UpdateProfile};

pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<UpdateProfile>,
) -> AppResult<Json<AccountView>> {
    Ok(Json(state.ctx.profiles().update_me(&user, input).await?))
}

/// Multipart upload with a single image file.
pub async fn upload_avatar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> AppResult<Json<AccountView>> {
    let mut files = read_files(multipart, state.ctx.settings.max_upload_bytes).await?;
    if files.len() != 1 {
        return Err(AppError::BadRequest("expected exactly one image".to_string()));
    }
    let bytes = files.remove(0);
    Ok(Json(state.ctx.profiles().set_avatar(&user, bytes).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PublicProfile>> {
    Ok(Json(state.ctx.profiles().get_public(&id).await?))
}

pub async fn user_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Vec<Review>>> {
    let reviews = state
        .ctx
        .reviews()
        .list_for_user(&id, page.limit, page.offset)
        .await?;
    Ok(Json(reviews))
}
