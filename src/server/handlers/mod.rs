//! HTTP request handlers for the API server.

pub mod admin;
pub mod applications;
pub mod auth;
mod helpers;
pub mod messages;
pub mod notifications;
pub mod reports;
pub mod requests;
pub mod reviews;
pub mod system;
pub mod users;
pub mod ws;
