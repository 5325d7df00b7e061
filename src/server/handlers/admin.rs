//! Moderation endpoints. Every handler requires an admin session.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::super::{AppResult, AppState};
use crate::auth::AdminUser;
use crate::models::{AccountView, Report, ReportStatus, Role};
use crate::repository::PlatformStats;
use crate::services::UserPage;

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportListParams {
    pub status: Option<ReportStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RoleInput {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct ResolveInput {
    pub status: ReportStatus,
    #[serde(default)]
    pub resolution: Option<String>,
}

pub async fn stats(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<PlatformStats>> {
    Ok(Json(state.ctx.admin().stats().await?))
}

pub async fn users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(params): Query<UserListParams>,
) -> AppResult<Json<UserPage>> {
    let page = state
        .ctx
        .admin()
        .list_users(params.q.as_deref(), params.limit, params.offset)
        .await?;
    Ok(Json(page))
}

pub async fn ban(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<AccountView>> {
    Ok(Json(state.ctx.admin().set_banned(&admin, &id, true).await?))
}

pub async fn unban(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<AccountView>> {
    Ok(Json(state.ctx.admin().set_banned(&admin, &id, false).await?))
}

pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(input): Json<RoleInput>,
) -> AppResult<Json<AccountView>> {
    Ok(Json(state.ctx.admin().set_role(&admin, &id, input.role).await?))
}

pub async fn reports(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(params): Query<ReportListParams>,
) -> AppResult<Json<Vec<Report>>> {
    let reports = state
        .ctx
        .reports()
        .list(params.status, params.limit, params.offset)
        .await?;
    Ok(Json(reports))
}

pub async fn resolve_report(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(input): Json<ResolveInput>,
) -> AppResult<Json<Report>> {
    let report = state
        .ctx
        .reports()
        .resolve(&admin, &id, input.status, input.resolution)
        .await?;
    Ok(Json(report))
}

pub async fn delete_request(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.ctx.admin().delete_request(&admin, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
