/// Hello endpoints
///
/// - `GET /hello` - Public greeting
/// - `GET /hello/api-key` - Same greeting, behind a public API key

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tenantry_shared::{auth::middleware::ApiKeyPayload, message::Message};

use crate::{app::AppState, response::ApiResponse};

/// Hello response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloResponse {
    pub user_agent: Option<String>,

    /// RFC 3339
    pub date: DateTime<Utc>,

    /// `date` as `YYYY-MM-DD`
    pub format: String,

    /// Milliseconds since the epoch
    pub timestamp: i64,
}

impl HelloResponse {
    fn new(headers: &HeaderMap, now: DateTime<Utc>) -> Self {
        Self {
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            date: now,
            format: now.format("%Y-%m-%d").to_string(),
            timestamp: now.timestamp_millis(),
        }
    }
}

fn hello_message(state: &AppState) -> Message {
    Message::new("app.hello").with("serviceName", &state.config.app.name)
}

pub async fn hello(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse<HelloResponse> {
    ApiResponse::ok(hello_message(&state), HelloResponse::new(&headers, Utc::now()))
}

pub async fn hello_api_key(
    State(state): State<AppState>,
    Extension(api_key): Extension<ApiKeyPayload>,
    headers: HeaderMap,
) -> ApiResponse<HelloResponse> {
    tracing::debug!(api_key_id = %api_key.id, "Hello via API key");
    ApiResponse::ok(hello_message(&state), HelloResponse::new(&headers, Utc::now()))
}
