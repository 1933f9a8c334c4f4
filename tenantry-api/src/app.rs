/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use tenantry_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config)?;
/// let app = tenantry_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use tenantry_shared::{
    auth::{
        api_key::API_KEY_HEADER,
        authorization::require_user_type,
        jwt::{JwtSettings, TokenType},
        middleware::{authenticate_api_key, bearer_token, AuthContext},
    },
    file::{FileLimits, PART_NUMBER_HEADER},
    message::{MessageService, CUSTOM_LANGUAGE_HEADER},
    models::{api_key::ApiKeyType, user::UserType},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    config::Config,
    error::ApiError,
    middleware::{request::request_context_layer, security::with_security_headers},
    routes,
};

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Language bundles
    pub messages: Arc<MessageService>,

    /// Token signing settings
    pub jwt: Arc<JwtSettings>,

    /// Upload limits
    pub file_limits: Arc<FileLimits>,

    /// Client for outbound probes
    pub http: reqwest::Client,
}

impl AppState {
    /// Creates new application state
    ///
    /// # Errors
    ///
    /// Fails when the configured default language has no bundle.
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let messages = MessageService::new(
            &config.message.language,
            &config.message.available_languages,
        )?;

        let jwt = JwtSettings {
            secret: config.jwt.secret.clone(),
            issuer: config.jwt.issuer.clone(),
            access_expiration: chrono::Duration::seconds(config.jwt.access_expiration_seconds),
            refresh_expiration: chrono::Duration::seconds(config.jwt.refresh_expiration_seconds),
        };

        let file_limits = FileLimits::new(config.file.max_size, config.file.max_files);

        Ok(Self {
            db,
            config: Arc::new(config),
            messages: Arc::new(messages),
            jwt: Arc::new(jwt),
            file_limits: Arc::new(file_limits),
            http: reqwest::Client::new(),
        })
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /hello                              # public
/// ├── /hello/api-key                      # public API key
/// ├── /message/languages                  # public
/// ├── /health[/database|/memory-heap|/memory-rss|/storage|/aws]
/// ├── /public/user/{register,active,login}
/// ├── /user/                              # access token
/// │   ├── POST /refresh                   # refresh token
/// │   ├── GET  /profile
/// │   ├── /api-key/...                    # owner scoped
/// │   └── /file/upload[/multiple]
/// └── /admin/user/{list,dashboard}        # access token + super_admin
/// ```
///
/// # Middleware Stack
///
/// Applied in order (innermost first):
/// 1. Authentication (per-route basis)
/// 2. Request context and envelope rendering
/// 3. Logging (tower-http TraceLayer)
/// 4. Compression, CORS, security headers
pub fn build_router(state: AppState) -> Router {
    let hello_routes = Router::new()
        .route("/", get(routes::hello::hello))
        .merge(
            Router::new()
                .route("/api-key", get(routes::hello::hello_api_key))
                .route_layer(from_fn_with_state(state.clone(), api_key_public_layer)),
        );

    let health_routes = Router::new()
        .route("/", get(routes::health::health))
        .route("/database", get(routes::health::database))
        .route("/memory-heap", get(routes::health::memory_heap))
        .route("/memory-rss", get(routes::health::memory_rss))
        .route("/storage", get(routes::health::storage))
        .route("/aws", get(routes::health::object_storage));

    // No authentication
    let public_user_routes = Router::new()
        .route("/register", post(routes::user::register))
        .route("/active", post(routes::user::activate))
        .route("/login", post(routes::user::login));

    let refresh_routes = Router::new()
        .route("/refresh", post(routes::user::refresh))
        .route_layer(from_fn_with_state(state.clone(), jwt_refresh_layer));

    let api_key_routes = Router::new()
        .route("/list", get(routes::api_keys::list_api_keys))
        .route("/get/:id", get(routes::api_keys::get_api_key))
        .route("/create", post(routes::api_keys::create_api_key))
        .route("/update/:id/reset", patch(routes::api_keys::reset_api_key))
        .route("/update/:id", put(routes::api_keys::update_api_key))
        .route("/update/:id/active", patch(routes::api_keys::activate_api_key))
        .route("/update/:id/inactive", patch(routes::api_keys::deactivate_api_key))
        .route("/delete/:id", delete(routes::api_keys::delete_api_key));

    // Room for every allowed file plus multipart framing
    let upload_limit = usize::try_from(state.config.file.max_size)
        .unwrap_or(usize::MAX)
        .saturating_mul(state.config.file.max_files.max(1))
        .saturating_add(64 * 1024);

    let file_routes = Router::new()
        .route("/upload", post(routes::file::upload))
        .route("/upload/multiple", post(routes::file::upload_multiple))
        .layer(DefaultBodyLimit::max(upload_limit));

    // Access token required
    let user_routes = Router::new()
        .route("/profile", get(routes::user::profile))
        .nest("/api-key", api_key_routes)
        .nest("/file", file_routes)
        .route_layer(from_fn_with_state(state.clone(), jwt_access_layer))
        .merge(refresh_routes);

    // Access token of a super admin; the JWT layer runs first
    let admin_routes = Router::new()
        .route("/user/list", get(routes::user::list_users))
        .route("/user/dashboard", get(routes::dashboard::user_dashboard))
        .route_layer(from_fn(super_admin_layer))
        .route_layer(from_fn_with_state(state.clone(), jwt_access_layer));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                HeaderName::from_static(API_KEY_HEADER),
                HeaderName::from_static(CUSTOM_LANGUAGE_HEADER),
                HeaderName::from_static(PART_NUMBER_HEADER),
            ])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    // Combine all routes with middleware stack
    let router = Router::new()
        .nest("/hello", hello_routes)
        .route("/message/languages", get(routes::message::languages))
        .nest("/health", health_routes)
        .nest("/public/user", public_user_routes)
        .nest("/user", user_routes)
        .nest("/admin", admin_routes)
        .fallback(routes::not_found)
        .layer(from_fn_with_state(state.clone(), request_context_layer))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors);

    with_security_headers(router, production).with_state(state)
}

/// Bearer token of the given type, validated and turned into an [`AuthContext`]
fn authenticate_bearer(
    state: &AppState,
    req: &Request,
    token_type: TokenType,
) -> Result<AuthContext, ApiError> {
    let token = bearer_token(req.headers())?;
    let claims = state.jwt.validate(token, token_type)?;
    Ok(AuthContext::from_claims(&claims))
}

/// Access-token guard
///
/// Validates the bearer token, then injects [`AuthContext`] into request
/// extensions.
pub async fn jwt_access_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate_bearer(&state, &req, TokenType::Access)?;
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

/// The raw refresh token, handed back unchanged by the refresh endpoint
#[derive(Debug, Clone)]
pub struct RefreshToken(pub String);

/// Refresh-token guard
pub async fn jwt_refresh_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate_bearer(&state, &req, TokenType::Refresh)?;
    let token = bearer_token(req.headers())?.to_string();

    req.extensions_mut().insert(auth);
    req.extensions_mut().insert(RefreshToken(token));

    Ok(next.run(req).await)
}

/// `x-api-key` guard for routes open to public keys
pub async fn api_key_public_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let payload = authenticate_api_key(&state.db, req.headers(), &[ApiKeyType::Public]).await?;
    req.extensions_mut().insert(payload);

    Ok(next.run(req).await)
}

/// Admin guard; must run after [`jwt_access_layer`]
pub async fn super_admin_layer(req: Request, next: Next) -> Result<Response, ApiError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| ApiError::Unauthorized("auth.error.tokenRequired".into()))?;

    require_user_type(auth, &[UserType::SuperAdmin])?;

    Ok(next.run(req).await)
}
