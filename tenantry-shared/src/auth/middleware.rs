/// Request authentication primitives
///
/// The api crate wires these into axum middleware; this module holds the
/// parts that do not depend on application state:
///
/// - [`bearer_token`] pulls the token out of `Authorization: Bearer <token>`
/// - [`AuthContext`] is inserted into request extensions after a JWT passes
/// - [`authenticate_api_key`] runs the `x-api-key` guard and yields the
///   [`ApiKeyPayload`] inserted for API-key routes
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use tenantry_shared::auth::middleware::bearer_token;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
///
/// assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
/// ```

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::api_key::{parse_header, verify_credentials, API_KEY_HEADER};
use super::jwt::{Claims, JwtError, TokenType};
use crate::models::api_key::{ApiKey, ApiKeyType};
use crate::models::user::UserType;

/// Authenticated user, added to request extensions by the JWT layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: String,
    pub user_type: UserType,

    /// Which token authenticated the request
    pub token_type: TokenType,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username.clone(),
            user_type: claims.user_type,
            token_type: claims.token_type,
        }
    }
}

/// Authenticated API key, added to request extensions by the API-key layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiKeyPayload {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub key: String,
    #[serde(rename = "type")]
    pub key_type: ApiKeyType,
    pub name: String,
}

impl From<&ApiKey> for ApiKeyPayload {
    fn from(api_key: &ApiKey) -> Self {
        Self {
            id: api_key.id,
            key: api_key.key.clone(),
            key_type: api_key.key_type,
            name: api_key.name.clone(),
        }
    }
}

/// Why a request could not be authenticated
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization bearer token is required")]
    TokenRequired,

    #[error("Authorization token is invalid: {0}")]
    TokenInvalid(String),

    #[error("Authorization token has expired")]
    TokenExpired,

    #[error("x-api-key header is required")]
    ApiKeyRequired,

    #[error("API key is invalid")]
    ApiKeyInvalid,

    #[error("API key not found")]
    ApiKeyNotFound,

    #[error("API key is inactive")]
    ApiKeyInactive,

    #[error("API key is outside its validity window")]
    ApiKeyExpired,

    #[error("API key type is not allowed here")]
    ApiKeyForbidden,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::TokenExpired,
            other => AuthError::TokenInvalid(other.to_string()),
        }
    }
}

/// Extracts the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::TokenRequired)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::TokenRequired)
}

/// Checks a loaded key against the presented secret and the route's rules
///
/// The order of checks decides which error a caller sees: secret, active
/// flag, validity window, then type.
pub fn check_api_key(
    api_key: &ApiKey,
    secret: &str,
    allowed: &[ApiKeyType],
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    if !verify_credentials(&api_key.key, secret, &api_key.hash) {
        return Err(AuthError::ApiKeyInvalid);
    }

    if !api_key.is_active {
        return Err(AuthError::ApiKeyInactive);
    }

    if !api_key.is_within_window(now) {
        return Err(AuthError::ApiKeyExpired);
    }

    if !allowed.contains(&api_key.key_type) {
        return Err(AuthError::ApiKeyForbidden);
    }

    Ok(())
}

/// Runs the `x-api-key` guard
///
/// On success the key's `last_used_at` is bumped and its payload returned.
pub async fn authenticate_api_key(
    pool: &PgPool,
    headers: &HeaderMap,
    allowed: &[ApiKeyType],
) -> Result<ApiKeyPayload, AuthError> {
    let raw = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or(AuthError::ApiKeyRequired)?;

    let (key, secret) = parse_header(raw).ok_or(AuthError::ApiKeyInvalid)?;

    let api_key = ApiKey::find_by_key(pool, key)
        .await?
        .ok_or(AuthError::ApiKeyNotFound)?;

    check_api_key(&api_key, secret, allowed, Utc::now())?;

    ApiKey::touch_last_used(pool, api_key.id).await?;
    debug!(api_key_id = %api_key.id, "API key authenticated");

    Ok(ApiKeyPayload::from(&api_key))
}
