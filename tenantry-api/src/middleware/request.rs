/// Request context and envelope rendering
///
/// [`request_context_layer`] runs around every route. Before the handler it
/// assigns a request id and resolves the caller's languages from
/// `x-custom-lang`. After the handler it renders any pending
/// [`Envelope`] with that context and stamps `x-request-id` and
/// `X-Response-Time` on the response.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use tenantry_shared::message::CUSTOM_LANGUAGE_HEADER;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::app::AppState;
use crate::response::{Envelope, Metadata};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub const RESPONSE_TIME_HEADER: HeaderName = HeaderName::from_static("x-response-time");

/// Per-request values, also available to handlers through `Extension`
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub languages: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub path: String,
}

impl RequestContext {
    pub fn metadata(&self, state: &AppState) -> Metadata {
        Metadata {
            languages: self.languages.clone(),
            timestamp: self.timestamp.timestamp_millis(),
            timezone: state.config.app.timezone.clone(),
            request_id: self.request_id.to_string(),
            path: self.path.clone(),
            version: state.config.app.versioning.clone(),
            repo_version: tenantry_shared::VERSION.to_string(),
            pagination: None,
        }
    }
}

pub async fn request_context_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let languages = state.messages.resolve_languages(
        req.headers()
            .get(CUSTOM_LANGUAGE_HEADER)
            .and_then(|v| v.to_str().ok()),
    );

    let context = RequestContext {
        request_id: Uuid::new_v4(),
        languages,
        timestamp: Utc::now(),
        path: req.uri().path().to_string(),
    };
    req.extensions_mut().insert(context.clone());

    let span = info_span!(
        "request",
        request_id = %context.request_id,
        method = %req.method(),
        path = %context.path,
    );

    async move {
        let mut response = next.run(req).await;

        if let Some(envelope) = response.extensions_mut().remove::<Envelope>() {
            response = render(response, &envelope, &state, &context);
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&context.request_id.to_string()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("{elapsed_ms:.3}ms")) {
            headers.insert(RESPONSE_TIME_HEADER, value);
        }

        info!(
            status = response.status().as_u16(),
            duration_ms = elapsed_ms,
            "Request finished"
        );

        response
    }
    .instrument(span)
    .await
}

/// Swaps the fallback body for the localized envelope
fn render(response: Response, envelope: &Envelope, state: &AppState, context: &RequestContext) -> Response {
    let body = envelope.render(&state.messages, context.metadata(state));
    let (mut parts, _) = response.into_parts();
    let (rendered, body) = Json(body).into_response().into_parts();

    parts.headers.remove(header::CONTENT_LENGTH);
    if let Some(content_type) = rendered.headers.get(header::CONTENT_TYPE) {
        parts.headers.insert(header::CONTENT_TYPE, content_type.clone());
    }

    Response::from_parts(parts, body)
}
