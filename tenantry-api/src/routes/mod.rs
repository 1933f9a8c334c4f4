/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `hello`: Service greeting, with and without an API key
/// - `message`: Available languages
/// - `health`: Health indicators
/// - `user`: Registration, activation, login, tokens, profile, admin list
/// - `dashboard`: Admin registration summary
/// - `api_keys`: API key management
/// - `file`: Uploads

pub mod api_keys;
pub mod dashboard;
pub mod file;
pub mod health;
pub mod hello;
pub mod message;
pub mod user;

use crate::error::ApiError;

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("app.error.notFound".into())
}
