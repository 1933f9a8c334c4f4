/// API key management endpoints
///
/// All endpoints require an access token and only ever see the caller's own
/// keys.
///
/// # Endpoints
///
/// - `GET    /user/api-key/list` - Paged list
/// - `GET    /user/api-key/get/:id` - One key
/// - `POST   /user/api-key/create` - Create (secret returned once)
/// - `PATCH  /user/api-key/update/:id/reset` - New secret
/// - `PUT    /user/api-key/update/:id` - Rename / change the validity window
/// - `PATCH  /user/api-key/update/:id/active` - Re-enable
/// - `PATCH  /user/api-key/update/:id/inactive` - Disable
/// - `DELETE /user/api-key/delete/:id` - Delete

use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenantry_shared::{
    auth::middleware::AuthContext,
    message::{Message, RequestErrorItem},
    models::api_key::{self, ApiKey, ApiKeyType, CreateApiKey, UpdateApiKey},
    pagination::{
        filter::{filter_equal_enum, filter_in_boolean, filter_owner, FilterSet},
        PaginationOptions, PaginationQuery,
    },
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    response::{ApiResponse, PagedResponse},
};

/// Create API key request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    #[validate(required, length(min = 1, max = 100))]
    pub name: Option<String>,

    /// Defaults to `public`
    #[serde(rename = "type", default)]
    pub key_type: ApiKeyType,

    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Update API key request
///
/// The dates replace the stored window; omitting both clears it.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApiKeyRequest {
    #[validate(required, length(min = 1, max = 100))]
    pub name: Option<String>,

    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Query of `GET /user/api-key/list`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyListQuery {
    #[serde(flatten)]
    pub pagination: PaginationQuery,

    /// Comma list of booleans
    pub is_active: Option<String>,

    #[serde(rename = "type")]
    pub key_type: Option<String>,
}

/// Key with its plaintext secret; only returned on create and reset
#[derive(Debug, Serialize)]
pub struct ApiKeyCreatedResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub key: String,
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyIdResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
}

/// Both dates or neither, and start strictly before end
fn check_date_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), ApiError> {
    let item = |property: &str, key: &str| RequestErrorItem {
        property: property.to_string(),
        message: Message::new(key).with("property", property),
    };

    match (start, end) {
        (None, None) => Ok(()),
        (Some(start), Some(end)) if start < end => Ok(()),
        (Some(_), Some(_)) => Err(ApiError::Validation(vec![item("endDate", "request.error.dateRange")])),
        (None, Some(_)) => Err(ApiError::Validation(vec![item("startDate", "request.error.datePair")])),
        (Some(_), None) => Err(ApiError::Validation(vec![item("endDate", "request.error.datePair")])),
    }
}

/// Expected active state for a state-changing action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequireActive {
    Active,
    Inactive,
}

/// Guards shared by update, reset, active and inactive
fn check_mutable(api_key: &ApiKey, required: RequireActive, now: DateTime<Utc>) -> Result<(), ApiError> {
    let state_ok = match required {
        RequireActive::Active => api_key.is_active,
        RequireActive::Inactive => !api_key.is_active,
    };
    if !state_ok {
        return Err(ApiError::BadRequest("apiKey.error.isActiveInvalid".into()));
    }

    if api_key.is_expired(now) {
        return Err(ApiError::BadRequest("apiKey.error.expired".into()));
    }

    Ok(())
}

async fn load_owned(state: &AppState, auth: &AuthContext, id: Uuid) -> ApiResult<ApiKey> {
    ApiKey::find_for_owner(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("apiKey.error.notFound".into()))
}

pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<ApiKeyListQuery>,
) -> ApiResult<PagedResponse<ApiKey>> {
    let pagination = PaginationOptions::new(api_key::SEARCHABLE_COLUMNS, api_key::ORDERABLE_COLUMNS)
        .resolve(&query.pagination);

    let filters = FilterSet::new()
        .with(filter_owner("user_id", auth.user_id))
        .with(filter_in_boolean("is_active", query.is_active.as_deref(), &[true, false]))
        .with(filter_equal_enum::<ApiKeyType>(
            "key_type",
            query.key_type.as_deref(),
            None,
        ));

    let keys = ApiKey::list(&state.db, &filters, &pagination).await?;
    let total = ApiKey::count(&state.db, &filters, Some(&pagination)).await?;

    Ok(PagedResponse::new("apiKey.list", keys, pagination, total))
}

pub async fn get_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<ApiKey>> {
    let api_key = load_owned(&state, &auth, id).await?;
    Ok(ApiResponse::ok("apiKey.get", api_key))
}

/// Create API key
///
/// Returns the plaintext secret ONLY on creation.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed or bad date window
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateApiKeyRequest>,
) -> ApiResult<ApiResponse<ApiKeyCreatedResponse>> {
    check_date_window(req.start_date, req.end_date)?;

    let (api_key, secret) = ApiKey::create(
        &state.db,
        CreateApiKey {
            user_id: auth.user_id,
            name: req.name.unwrap_or_default(),
            key_type: req.key_type,
            start_date: req.start_date,
            end_date: req.end_date,
        },
    )
    .await?;

    tracing::info!(api_key_id = %api_key.id, user_id = %auth.user_id, "API key created");

    Ok(ApiResponse::created(
        "apiKey.create",
        ApiKeyCreatedResponse {
            id: api_key.id,
            key: api_key.key,
            secret,
        },
    ))
}

pub async fn reset_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<ApiKeyCreatedResponse>> {
    let api_key = load_owned(&state, &auth, id).await?;
    check_mutable(&api_key, RequireActive::Active, Utc::now())?;

    let secret = api_key
        .reset_secret(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("apiKey.error.notFound".into()))?;

    tracing::info!(api_key_id = %api_key.id, "API key secret reset");

    Ok(ApiResponse::ok(
        "apiKey.reset",
        ApiKeyCreatedResponse {
            id: api_key.id,
            key: api_key.key,
            secret,
        },
    ))
}

pub async fn update_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateApiKeyRequest>,
) -> ApiResult<ApiResponse<ApiKeyIdResponse>> {
    let api_key = load_owned(&state, &auth, id).await?;
    check_mutable(&api_key, RequireActive::Active, Utc::now())?;
    check_date_window(req.start_date, req.end_date)?;

    ApiKey::update(
        &state.db,
        api_key.id,
        UpdateApiKey {
            name: req.name.unwrap_or_default(),
            start_date: req.start_date,
            end_date: req.end_date,
        },
    )
    .await?;

    Ok(ApiResponse::ok("apiKey.update", ApiKeyIdResponse { id: api_key.id }))
}

pub async fn activate_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let api_key = load_owned(&state, &auth, id).await?;
    check_mutable(&api_key, RequireActive::Inactive, Utc::now())?;

    ApiKey::set_active(&state.db, api_key.id, true).await?;

    Ok(ApiResponse::message("apiKey.active"))
}

pub async fn deactivate_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let api_key = load_owned(&state, &auth, id).await?;
    check_mutable(&api_key, RequireActive::Active, Utc::now())?;

    ApiKey::set_active(&state.db, api_key.id, false).await?;

    Ok(ApiResponse::message("apiKey.inactive"))
}

pub async fn delete_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let api_key = load_owned(&state, &auth, id).await?;

    ApiKey::delete(&state.db, api_key.id).await?;
    tracing::info!(api_key_id = %api_key.id, "API key deleted");

    Ok(ApiResponse::message("apiKey.delete"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Duration;

    fn api_key(is_active: bool, end_date: Option<DateTime<Utc>>) -> ApiKey {
        let now = Utc::now();
        ApiKey {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Billing sync".to_string(),
            key_type: ApiKeyType::Public,
            key: "tk_test".to_string(),
            hash: String::new(),
            is_active,
            start_date: None,
            end_date,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_check_date_window() {
        let now = Utc::now();
        let later = now + Duration::days(1);

        assert!(check_date_window(None, None).is_ok());
        assert!(check_date_window(Some(now), Some(later)).is_ok());

        match check_date_window(Some(later), Some(now)) {
            Err(ApiError::Validation(items)) => {
                assert_eq!(items[0].property, "endDate");
                assert_eq!(items[0].message.key, "request.error.dateRange");
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let err = check_date_window(Some(now), None).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_check_mutable() {
        let now = Utc::now();

        assert!(check_mutable(&api_key(true, None), RequireActive::Active, now).is_ok());
        assert!(check_mutable(&api_key(false, None), RequireActive::Inactive, now).is_ok());

        let err = check_mutable(&api_key(false, None), RequireActive::Active, now).unwrap_err();
        assert_eq!(err.message().key, "apiKey.error.isActiveInvalid");

        let expired = api_key(true, Some(now - Duration::hours(1)));
        let err = check_mutable(&expired, RequireActive::Active, now).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message().key, "apiKey.error.expired");
    }

    #[test]
    fn test_create_request_defaults_to_public() {
        let req: CreateApiKeyRequest = serde_json::from_str(r#"{"name":"Billing sync"}"#).unwrap();
        assert_eq!(req.key_type, ApiKeyType::Public);
        assert!(req.start_date.is_none());
    }

    #[test]
    fn test_create_request_requires_name() {
        let req: CreateApiKeyRequest = serde_json::from_str(r#"{"type":"private"}"#).unwrap();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.field_errors()["name"][0].code, "required");
    }
}
