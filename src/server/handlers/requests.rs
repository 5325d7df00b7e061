//! Help-request endpoints.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use super::super::{AppResult, AppState};
use super::helpers::read_files;
use crate::auth::{AuthUser, MaybeUser};
use crate::models::HelpRequest;
use crate::services::{
    MyRequests, NewRequest, RequestDetail, RequestSummary, SearchQuery, UpdateRequest,
};

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<RequestSummary>>> {
    Ok(Json(state.ctx.requests().search(&query).await?))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<NewRequest>,
) -> AppResult<(StatusCode, Json<HelpRequest>)> {
    let req = state.ctx.requests().create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(req)))
}

pub async fn mine(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<MyRequests>> {
    Ok(Json(state.ctx.requests().list_mine(&user).await?))
}

pub async fn detail(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<RequestDetail>> {
    Ok(Json(state.ctx.requests().get(&id, viewer.as_ref()).await?))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateRequest>,
) -> AppResult<Json<HelpRequest>> {
    Ok(Json(state.ctx.requests().update(&user, &id, input).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<HelpRequest>> {
    Ok(Json(state.ctx.requests().cancel(&user, &id).await?))
}

pub async fn complete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<HelpRequest>> {
    Ok(Json(state.ctx.requests().complete(&user, &id).await?))
}

pub async fn release(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<HelpRequest>> {
    Ok(Json(state.ctx.requests().release(&user, &id).await?))
}

/// Multipart upload; every file part is attached to the request.
pub async fn upload_images(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Json<HelpRequest>> {
    let files = read_files(multipart, state.ctx.settings.max_upload_bytes).await?;
    Ok(Json(state.ctx.requests().add_images(&user, &id, files).await?))
}
