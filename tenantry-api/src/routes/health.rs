/// Health check endpoints
///
/// Each endpoint runs one indicator and answers with the aggregated report:
///
/// ```json
/// {
///   "status": "ok",
///   "info": { "database": { "status": "up", "details": { ... } } },
///   "error": {},
///   "details": { "database": { "status": "up", "details": { ... } } }
/// }
/// ```
///
/// A down indicator turns the response into a 503 carrying the same report.
///
/// # Endpoints
///
/// - `GET /health` and `GET /health/database` - Database connectivity
/// - `GET /health/memory-heap` - Process data segment
/// - `GET /health/memory-rss` - Resident set size
/// - `GET /health/storage` - Disk usage
/// - `GET /health/aws` - Object storage bucket

use axum::extract::State;
use serde_json::Value;
use tenantry_shared::health::{
    check_all, DatabaseIndicator, DiskIndicator, HealthIndicator, HealthReport, MemoryIndicator,
    MemoryKind, ObjectStorageIndicator,
};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};

async fn respond(indicator: &dyn HealthIndicator) -> ApiResult<ApiResponse<HealthReport>> {
    let report = check_all(&[indicator]).await;

    if report.is_ok() {
        return Ok(ApiResponse::ok("health.check", report));
    }

    tracing::warn!(indicator = indicator.key(), "Health check failed");
    let data = serde_json::to_value(&report).unwrap_or(Value::Null);
    Err(ApiError::ServiceUnavailable {
        message: "health.check".into(),
        data,
    })
}

/// `GET /health`
pub async fn health(state: State<AppState>) -> ApiResult<ApiResponse<HealthReport>> {
    database(state).await
}

pub async fn database(State(state): State<AppState>) -> ApiResult<ApiResponse<HealthReport>> {
    respond(&DatabaseIndicator::new(state.db.clone())).await
}

pub async fn memory_heap(State(state): State<AppState>) -> ApiResult<ApiResponse<HealthReport>> {
    let threshold = state.config.health.memory_heap_threshold;
    respond(&MemoryIndicator::new(MemoryKind::Heap, threshold)).await
}

pub async fn memory_rss(State(state): State<AppState>) -> ApiResult<ApiResponse<HealthReport>> {
    let threshold = state.config.health.memory_rss_threshold;
    respond(&MemoryIndicator::new(MemoryKind::Rss, threshold)).await
}

pub async fn storage(State(state): State<AppState>) -> ApiResult<ApiResponse<HealthReport>> {
    let health = &state.config.health;
    respond(&DiskIndicator::new(health.disk_path.clone(), health.disk_threshold)).await
}

/// `GET /health/aws`
pub async fn object_storage(State(state): State<AppState>) -> ApiResult<ApiResponse<HealthReport>> {
    let url = state.config.health.object_storage_url.clone();
    respond(&ObjectStorageIndicator::new(state.http.clone(), url)).await
}
