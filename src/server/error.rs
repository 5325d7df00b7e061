//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::geo::GeoError;
use crate::images::ImageError;
use crate::services::ServiceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{0}")]
    BadRequest(String),

    #[error("upload is too large")]
    PayloadTooLarge,
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        Self::Service(e.into())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Service(e) => match e {
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::Conflict(_) | ServiceError::InvalidTransition { .. } => {
                    StatusCode::CONFLICT
                }
                ServiceError::Auth(AuthError::MissingToken)
                | ServiceError::Auth(AuthError::InvalidSession)
                | ServiceError::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
                ServiceError::Auth(AuthError::Banned)
                | ServiceError::Auth(AuthError::AdminRequired) => StatusCode::FORBIDDEN,
                ServiceError::Geo(GeoError::OutsideArea { .. }) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ServiceError::Geo(_) => StatusCode::BAD_REQUEST,
                ServiceError::Image(ImageError::TooLarge { .. })
                | ServiceError::Image(ImageError::TooManyPixels { .. }) => {
                    StatusCode::PAYLOAD_TOO_LARGE
                }
                ServiceError::Image(ImageError::Unsupported(_)) => {
                    StatusCode::UNSUPPORTED_MEDIA_TYPE
                }
                ServiceError::Image(ImageError::Empty)
                | ServiceError::Image(ImageError::Decode(_)) => StatusCode::BAD_REQUEST,
                ServiceError::Image(ImageError::Io(_))
                | ServiceError::Password(_)
                | ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut body = json!({ "error": message });
        if let AppError::Service(ServiceError::Geo(GeoError::OutsideArea {
            distance_km,
            radius_km,
        })) = &self
        {
            body["distance_km"] = json!(distance_km);
            body["radius_km"] = json!(radius_km);
        }

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
