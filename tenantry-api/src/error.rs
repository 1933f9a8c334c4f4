/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers should return `Result<T, ApiError>`. Every variant carries a
/// message key, which the envelope middleware localizes for the caller.
///
/// # Example
///
/// ```
/// use tenantry_api::error::{ApiError, ApiResult};
/// use tenantry_api::response::ApiResponse;
///
/// async fn handler(found: bool) -> ApiResult<ApiResponse<()>> {
///     if !found {
///         return Err(ApiError::NotFound("user.error.notFound".into()));
///     }
///     Ok(ApiResponse::message("user.profile"))
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tenantry_shared::{
    auth::{
        authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError,
    },
    file::FileError,
    message::{Message, RequestErrorItem},
};

use crate::response::Envelope;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400)
    #[error("Bad request: {}", .0.key)]
    BadRequest(Message),

    /// Unauthorized (401)
    #[error("Unauthorized: {}", .0.key)]
    Unauthorized(Message),

    /// Forbidden (403)
    #[error("Forbidden: {}", .0.key)]
    Forbidden(Message),

    /// Not found (404)
    #[error("Not found: {}", .0.key)]
    NotFound(Message),

    /// Conflict (409) - e.g., duplicate username
    #[error("Conflict: {}", .0.key)]
    Conflict(Message),

    /// Payload too large (413)
    #[error("Payload too large: {}", .0.key)]
    PayloadTooLarge(Message),

    /// Unsupported media type (415)
    #[error("Unsupported media type: {}", .0.key)]
    UnsupportedMediaType(Message),

    /// Unprocessable entity (422) for a single domain rule
    #[error("Unprocessable: {}", .0.key)]
    Unprocessable(Message),

    /// Unprocessable entity (422) - request validation errors
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<RequestErrorItem>),

    /// Internal server error (500); `reason` is logged, never sent
    #[error("Internal error: {reason}")]
    Internal { message: Message, reason: String },

    /// Service unavailable (503), carrying the failed report as data
    #[error("Service unavailable: {}", .message.key)]
    ServiceUnavailable { message: Message, data: Value },
}

impl ApiError {
    /// Internal error with the generic message
    pub fn internal(reason: impl Into<String>) -> Self {
        ApiError::Internal {
            message: Message::new("app.error.internal"),
            reason: reason.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Unprocessable(_) | ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message key (with properties) for the envelope
    pub fn message(&self) -> Message {
        match self {
            ApiError::BadRequest(message)
            | ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::PayloadTooLarge(message)
            | ApiError::UnsupportedMediaType(message)
            | ApiError::Unprocessable(message)
            | ApiError::Internal { message, .. }
            | ApiError::ServiceUnavailable { message, .. } => message.clone(),
            ApiError::Validation(_) => Message::new("request.validation"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        let envelope = match self {
            ApiError::Validation(errors) => Envelope::new(status, message).with_errors(errors),
            ApiError::ServiceUnavailable { data, .. } => Envelope::new(status, message).with_data(data),
            ApiError::Internal { reason, .. } => {
                // Log internal errors but don't expose details to clients
                tracing::error!(%reason, "Internal error");
                Envelope::new(status, message)
            }
            _ => Envelope::new(status, message),
        };

        envelope.into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("app.error.notFound".into()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict("app.error.conflict".into())
            }
            _ => ApiError::internal(format!("Database error: {}", err)),
        }
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenRequired => ApiError::Unauthorized("auth.error.tokenRequired".into()),
            AuthError::TokenInvalid(reason) => {
                tracing::debug!(%reason, "Rejected bearer token");
                ApiError::Unauthorized("auth.error.tokenInvalid".into())
            }
            AuthError::TokenExpired => ApiError::Unauthorized("auth.error.tokenExpired".into()),
            AuthError::ApiKeyRequired => ApiError::Unauthorized("apiKey.error.required".into()),
            AuthError::ApiKeyInvalid => ApiError::Unauthorized("apiKey.error.invalid".into()),
            AuthError::ApiKeyNotFound => ApiError::Unauthorized("apiKey.error.notFound".into()),
            AuthError::ApiKeyInactive => ApiError::Unauthorized("apiKey.error.inactive".into()),
            AuthError::ApiKeyExpired => ApiError::Unauthorized("apiKey.error.expired".into()),
            AuthError::ApiKeyForbidden => ApiError::Forbidden("apiKey.error.forbidden".into()),
            AuthError::Database(err) => ApiError::from(err),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::UserTypeNotAllowed { actual } => {
                tracing::debug!(?actual, "User type not allowed");
                ApiError::Forbidden("auth.error.forbidden".into())
            }
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::internal(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(reason) => ApiError::internal(format!("Token creation failed: {reason}")),
            other => ApiError::from(AuthError::from(other)),
        }
    }
}

/// Convert upload errors to API errors
impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::Required => ApiError::Unprocessable("file.error.required".into()),
            FileError::MaxFiles { max } => {
                ApiError::PayloadTooLarge(Message::new("file.error.maxFiles").with("max", max))
            }
            FileError::MaxSize { max } => {
                ApiError::PayloadTooLarge(Message::new("file.error.maxSize").with("max", max))
            }
            FileError::MimeInvalid { mime } => ApiError::UnsupportedMediaType(
                Message::new("file.error.mimeInvalid").with("mime", mime),
            ),
            FileError::InvalidSize(raw) => ApiError::internal(format!("Invalid size setting {raw}")),
            FileError::Storage(err) => ApiError::Internal {
                message: Message::new("file.error.storage"),
                reason: err.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "Rejected JSON body");
        ApiError::BadRequest("request.error.invalidBody".into())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "Rejected path parameters");
        ApiError::BadRequest("request.error.invalidParam".into())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "Rejected query string");
        ApiError::BadRequest("request.error.invalidQuery".into())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "Rejected multipart body");
        ApiError::BadRequest("request.error.invalidBody".into())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge("file.error.maxSize".into());
        }

        tracing::debug!(reason = %err.body_text(), "Malformed multipart field");
        ApiError::BadRequest("request.error.invalidBody".into())
    }
}
