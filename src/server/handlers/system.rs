//! Health and service-area endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::super::{AppResult, AppState};
use crate::geo::{round_km, GeoPoint};
use crate::services::ServiceError;

/// Health check for load balancers; 503 when the database is unreachable.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.ctx.db.test_connection().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

/// The configured service area.
pub async fn geo_area(State(state): State<AppState>) -> impl IntoResponse {
    let geo = &state.ctx.settings.geo;
    Json(json!({
        "center": geo.center,
        "radius_km": geo.radius_km,
        "default_search_radius_km": geo.default_search_radius_km,
        "max_search_radius_km": geo.max_search_radius_km,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    pub lat: f64,
    pub lng: f64,
}

/// Whether a point is inside the service area, and how far from the center.
pub async fn geo_check(
    State(state): State<AppState>,
    Query(params): Query<CheckParams>,
) -> AppResult<impl IntoResponse> {
    let point = GeoPoint::new(params.lat, params.lng).map_err(ServiceError::from)?;
    let fence = state.ctx.geofence();
    let distance = fence.center.distance_km(&point);
    Ok(Json(json!({
        "inside": fence.contains(point),
        "distance_km": round_km(distance),
        "radius_km": fence.radius_km,
    })))
}
