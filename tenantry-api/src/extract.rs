/// Extractors with enveloped rejections
///
/// Axum's own extractors answer with plain-text errors. These wrappers turn
/// every rejection into an [`ApiError`] so failures use the same envelope as
/// the rest of the API.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tenantry_shared::message::request_error_items;
use validator::Validate;

use crate::error::ApiError;

/// JSON body that must also pass its `validator` rules
///
/// Malformed JSON is a 400 `request.error.invalidBody`; rule failures are a
/// 422 `request.validation` with one entry per failed rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;

        value
            .validate()
            .map_err(|errors| ApiError::Validation(request_error_items(&errors)))?;

        Ok(Self(value))
    }
}

/// `axum::extract::Path` answering 400 `request.error.invalidParam`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `axum::extract::Query` answering 400 `request.error.invalidQuery`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
