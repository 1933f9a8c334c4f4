/// User endpoints
///
/// # Endpoints
///
/// - `POST /public/user/register` - Register an inactive account
/// - `POST /public/user/active` - Activate with the emailed key
/// - `POST /public/user/login` - Login and get tokens
/// - `POST /user/refresh` - New access token from a refresh token
/// - `GET /user/profile` - Current user
/// - `GET /admin/user/list` - Paged user list (super admin)

use std::borrow::Cow;

use axum::{extract::State, Extension};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tenantry_shared::{
    auth::{
        jwt::{TokenType, TOKEN_TYPE_BEARER},
        middleware::AuthContext,
        password,
        random::{random_string, LOWER_ALPHANUMERIC},
    },
    models::user::{
        self, ActivationError, CreateUser, LoginDenied, User, UserStatus, UserType,
    },
    pagination::{
        filter::{filter_equal_enum, filter_in_enum, FilterEnum, FilterSet},
        PaginationOptions, PaginationQuery,
    },
};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    app::{AppState, RefreshToken},
    error::{ApiError, ApiResult},
    extract::{ApiQuery, ValidatedJson},
    response::{ApiResponse, PagedResponse},
};

/// Length of the activation key sent to new users
const ACTIVE_KEY_LENGTH: usize = 100;

/// Letters, digits, `_`, `.` and `-`
fn validate_username(username: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-');

    if username.chars().all(allowed) {
        Ok(())
    } else {
        let mut error = ValidationError::new("username");
        error.message = Some(Cow::Borrowed("invalid username characters"));
        Err(error)
    }
}

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(required, length(min = 3, max = 100), custom(function = "validate_username"))]
    pub username: Option<String>,

    /// Checked against the strength policy
    #[validate(required, custom(function = "password::validate_password_strength"))]
    pub password: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 250))]
    pub address: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(min = 8, max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IdResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
}

/// Activation request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    #[validate(required, length(min = 1))]
    pub username: Option<String>,

    #[validate(required, length(min = 1))]
    pub active_key: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(required, length(min = 1))]
    pub username: Option<String>,

    #[validate(required, length(min = 1))]
    pub password: Option<String>,
}

/// Login and refresh response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Always `Bearer`
    pub token_type: &'static str,

    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub access_token: String,
    pub refresh_token: String,
}

/// Query of `GET /admin/user/list`
#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    #[serde(flatten)]
    pub pagination: PaginationQuery,

    /// Comma list of statuses
    pub status: Option<String>,

    #[serde(rename = "type")]
    pub user_type: Option<String>,
}

fn login_denied(denied: LoginDenied) -> ApiError {
    match denied {
        LoginDenied::Inactive => ApiError::Forbidden("user.error.inactive".into()),
        LoginDenied::PasswordExpired => ApiError::Forbidden("user.error.passwordExpired".into()),
    }
}

/// Register a new user
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Username already exists
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<ApiResponse<IdResponse>> {
    // Both present once validated
    let username = req.username.unwrap_or_default();
    let plain = req.password.unwrap_or_default();

    if User::exists_by_username(&state.db, &username).await? {
        return Err(ApiError::Conflict("user.error.usernameExist".into()));
    }

    let password_hash = password::hash_password(&plain)?;
    let now = Utc::now();
    let settings = &state.config.user;

    let user = User::create(
        &state.db,
        CreateUser {
            username,
            password_hash,
            name: req.name,
            email: req.email,
            phone: req.phone,
            address: req.address,
            active_key: random_string(ACTIVE_KEY_LENGTH, LOWER_ALPHANUMERIC),
            active_expire: now + Duration::hours(settings.active_key_expiration_hours),
            password_expired_at: now + Duration::days(settings.password_expiration_days),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(ApiResponse::created("user.register", IdResponse { id: user.id }))
}

/// Activate an account
///
/// # Errors
///
/// - `404 Not Found`: Unknown username
/// - `400 Bad Request`: Wrong (or already used) key
/// - `422 Unprocessable Entity`: Key expired
pub async fn activate(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ActivateRequest>,
) -> ApiResult<ApiResponse<()>> {
    let username = req.username.as_deref().unwrap_or_default();
    let active_key = req.active_key.as_deref().unwrap_or_default();

    let user = User::find_by_username(&state.db, username)
        .await?
        .ok_or_else(|| ApiError::NotFound("user.error.notFound".into()))?;

    let now = Utc::now();
    user.verify_activation(active_key, now)
        .map_err(|err| match err {
            ActivationError::KeyInvalid => ApiError::BadRequest("user.error.activeKeyInvalid".into()),
            ActivationError::KeyExpired => {
                ApiError::Unprocessable("user.error.activeKeyExpired".into())
            }
        })?;

    User::activate(&state.db, user.id, now).await?;
    tracing::info!(user_id = %user.id, "User activated");

    Ok(ApiResponse::message("user.active"))
}

/// Login endpoint
///
/// # Errors
///
/// - `404 Not Found`: Unknown username
/// - `400 Bad Request`: Wrong password
/// - `403 Forbidden`: Inactive account or expired password
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<ApiResponse<TokenResponse>> {
    let username = req.username.as_deref().unwrap_or_default();
    let plain = req.password.as_deref().unwrap_or_default();

    let user = User::find_by_username(&state.db, username)
        .await?
        .ok_or_else(|| ApiError::NotFound("user.error.notFound".into()))?;

    if !password::verify_password(plain, &user.password_hash)? {
        return Err(ApiError::BadRequest("user.error.passwordNotMatch".into()));
    }

    user.check_can_login(Utc::now()).map_err(login_denied)?;

    User::update_last_login(&state.db, user.id).await?;

    let access_token = state
        .jwt
        .issue(user.id, &user.username, user.user_type, TokenType::Access)?;
    let refresh_token = state
        .jwt
        .issue(user.id, &user.username, user.user_type, TokenType::Refresh)?;

    Ok(ApiResponse::ok(
        "user.login",
        TokenResponse {
            token_type: TOKEN_TYPE_BEARER,
            expires_in: state.jwt.access_expiration.num_seconds(),
            access_token,
            refresh_token,
        },
    ))
}

/// Token refresh endpoint
///
/// Re-checks the account before issuing, so a deactivated user cannot keep
/// refreshing. The refresh token itself is returned unchanged.
pub async fn refresh(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(RefreshToken(refresh_token)): Extension<RefreshToken>,
) -> ApiResult<ApiResponse<TokenResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user.error.notFound".into()))?;

    user.check_can_login(Utc::now()).map_err(login_denied)?;

    let access_token = state
        .jwt
        .issue(user.id, &user.username, user.user_type, TokenType::Access)?;

    Ok(ApiResponse::ok(
        "user.refresh",
        TokenResponse {
            token_type: TOKEN_TYPE_BEARER,
            expires_in: state.jwt.access_expiration.num_seconds(),
            access_token,
            refresh_token,
        },
    ))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user.error.notFound".into()))?;

    user.check_can_login(Utc::now()).map_err(login_denied)?;

    Ok(ApiResponse::ok("user.profile", user))
}

/// Paged user list
///
/// Search covers username, name and email. `status` defaults to every
/// status; `type` has no default.
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> ApiResult<PagedResponse<User>> {
    let pagination = PaginationOptions::new(user::SEARCHABLE_COLUMNS, user::ORDERABLE_COLUMNS)
        .resolve(&query.pagination);

    let filters = FilterSet::new()
        .with(filter_in_enum("status", query.status.as_deref(), UserStatus::VARIANTS))
        .with(filter_equal_enum::<UserType>(
            "user_type",
            query.user_type.as_deref(),
            None,
        ));

    let users = User::list(&state.db, &filters, &pagination).await?;
    let total = User::count(&state.db, &filters, Some(&pagination)).await?;

    Ok(PagedResponse::new("user.list", users, pagination, total))
}
