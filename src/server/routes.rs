//! Router configuration for the API server.

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{
    admin, applications, auth, messages, notifications, reports, requests, reviews, system,
    users, ws,
};
use super::AppState;
use crate::config::Settings;
use crate::images::UPLOADS_URL_PREFIX;
use crate::models::MAX_REQUEST_IMAGES;

/// Room for multipart boundaries and headers on top of the image payloads.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

fn body_limit(settings: &Settings) -> usize {
    settings.max_upload_bytes * MAX_REQUEST_IMAGES + BODY_OVERHEAD_BYTES
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let Some(origin) = settings.cors_origin.as_deref() else {
        return CorsLayer::permissive();
    };
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            tracing::warn!("Invalid CORS origin {:?}, allowing any origin", origin);
            CorsLayer::permissive()
        }
    }
}

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let settings = state.ctx.settings.clone();
    let limit = body_limit(&settings);

    let api = Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // Service area
        .route("/geo/area", get(system::geo_area))
        .route("/geo/check", get(system::geo_check))
        // Profiles
        .route("/users/me", patch(users::update_me))
        .route("/users/me/avatar", post(users::upload_avatar))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/reviews", get(users::user_reviews))
        // Requests
        .route("/requests", get(requests::search).post(requests::create))
        .route("/requests/mine", get(requests::mine))
        .route(
            "/requests/:id",
            get(requests::detail).patch(requests::update),
        )
        .route("/requests/:id/cancel", post(requests::cancel))
        .route("/requests/:id/complete", post(requests::complete))
        .route("/requests/:id/release", post(requests::release))
        .route("/requests/:id/images", post(requests::upload_images))
        .route("/requests/:id/applications", post(applications::apply))
        .route(
            "/requests/:id/messages",
            get(messages::history).post(messages::send),
        )
        .route("/requests/:id/reviews", post(reviews::create))
        // Applications
        .route("/applications/mine", get(applications::mine))
        .route("/applications/:id/accept", post(applications::accept))
        .route("/applications/:id/decline", post(applications::decline))
        .route("/applications/:id/withdraw", post(applications::withdraw))
        // Reports and notifications
        .route("/reports", post(reports::create))
        .route("/notifications", get(notifications::list))
        .route("/notifications/unread", get(notifications::unread_count))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/:id/read", post(notifications::mark_read))
        // Admin
        .route("/admin/stats", get(admin::stats))
        .route("/admin/users", get(admin::users))
        .route("/admin/users/:id/ban", post(admin::ban))
        .route("/admin/users/:id/unban", post(admin::unban))
        .route("/admin/users/:id/role", post(admin::set_role))
        .route("/admin/reports", get(admin::reports))
        .route("/admin/reports/:id/resolve", post(admin::resolve_report))
        .route("/admin/requests/:id", delete(admin::delete_request));

    Router::new()
        .route("/health", get(system::health))
        .route("/ws", get(ws::upgrade))
        .nest("/api", api)
        .nest_service(UPLOADS_URL_PREFIX, ServeDir::new(&settings.uploads_dir))
        .layer(DefaultBodyLimit::max(limit))
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(cors_layer(&settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_limit_covers_a_full_upload() {
        let settings = Settings::default();
        assert!(body_limit(&settings) > settings.max_upload_bytes * MAX_REQUEST_IMAGES);
    }
}
