//! Errors shared by every service.

use thiserror::Error;

use crate::auth::AuthError;
use crate::geo::GeoError;
use crate::images::ImageError;
use crate::models::RequestStatus;
use crate::repository::DbError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("cannot move request from {} to {}", from.as_str(), to.as_str())]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("password hashing failed: {0}")]
    Password(bcrypt::BcryptError),

    #[error("database error: {0}")]
    Database(#[from] DbError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}
