//! Authentication: password hashing, opaque session tokens, and the axum
//! extractors that turn a bearer token into a signed-in user.

mod guard;
mod password;
mod service;
mod token;

use thiserror::Error;

pub use guard::{bearer_token, AdminUser, AuthUser, MaybeUser, SocketUser};
pub use password::{hash_password, verify_password, PASSWORD_COST};
pub use service::{AuthService, AuthSession, RegisterInput};
pub use token::{generate_token, hash_token};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authentication required")]
    MissingToken,

    #[error("session is invalid or expired")]
    InvalidSession,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is banned")]
    Banned,

    #[error("admin role required")]
    AdminRequired,
}
