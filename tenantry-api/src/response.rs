/// Response envelope
///
/// Handlers return [`ApiResponse`] or [`PagedResponse`], and errors convert
/// through [`ApiError`](crate::error::ApiError). All three end up as an
/// [`Envelope`] stored in the response extensions. The envelope middleware
/// (`crate::middleware::request`) renders it into the final body:
///
/// ```json
/// {
///   "statusCode": 200,
///   "message": "<localized>",
///   "_metadata": { "languages": ["en"], "requestId": "...", ... },
///   "data": {}
/// }
/// ```
///
/// Without the middleware a plain JSON body with the untranslated message
/// key is sent instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tenantry_shared::message::{ErrorMessage, Message, MessageService, RequestErrorItem};
use tenantry_shared::pagination::{PaginationList, PaginationMeta, PaginationTotals};

use crate::error::ApiError;

/// Pagination block of a paged envelope
#[derive(Debug, Clone)]
pub struct Paging {
    pub meta: PaginationMeta,
    pub totals: PaginationTotals,
}

/// A response waiting to be rendered with the request context
#[derive(Debug, Clone)]
pub struct Envelope {
    pub status: StatusCode,
    pub message: Message,
    pub data: Option<Value>,
    pub paging: Option<Paging>,

    /// Field errors, only set on validation failures
    pub errors: Vec<RequestErrorItem>,
}

/// `_metadata` of every rendered envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub languages: Vec<String>,
    /// Milliseconds since the epoch at request start
    pub timestamp: i64,
    pub timezone: String,
    pub request_id: String,
    pub path: String,
    pub version: String,
    pub repo_version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderedEnvelope<'a> {
    status_code: u16,
    message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<ErrorMessage>>,

    #[serde(rename = "_metadata")]
    metadata: Metadata,

    #[serde(rename = "_pagination", skip_serializing_if = "Option::is_none")]
    pagination: Option<PaginationTotals>,

    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
}

impl Envelope {
    pub fn new(status: StatusCode, message: Message) -> Self {
        Self {
            status,
            message,
            data: None,
            paging: None,
            errors: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_errors(mut self, errors: Vec<RequestErrorItem>) -> Self {
        self.errors = errors;
        self
    }

    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

    /// Localizes the envelope for `languages`
    pub fn render(&self, messages: &MessageService, mut metadata: Metadata) -> Value {
        let languages = metadata.languages.clone();

        let errors = (!self.errors.is_empty())
            .then(|| messages.request_errors(&self.errors, &languages));

        metadata.pagination = self.paging.as_ref().map(|p| p.meta.clone());

        let rendered = RenderedEnvelope {
            status_code: self.status.as_u16(),
            message: messages.render(&self.message, &languages),
            errors,
            metadata,
            pagination: self.paging.as_ref().map(|p| p.totals),
            data: self.data.as_ref(),
        };

        serde_json::to_value(rendered).unwrap_or_else(|_| json!({
            "statusCode": self.status.as_u16(),
            "message": self.message.key,
        }))
    }

    /// Body sent when no middleware renders the envelope
    fn fallback_body(&self) -> Value {
        let mut body = json!({
            "statusCode": self.status.as_u16(),
            "message": self.message.key,
        });

        if !self.errors.is_empty() {
            body["errors"] = self
                .errors
                .iter()
                .map(|item| json!({ "property": item.property, "message": item.message.key }))
                .collect();
        }
        if let Some(paging) = &self.paging {
            body["_pagination"] = json!(paging.totals);
        }
        if let Some(data) = &self.data {
            body["data"] = data.clone();
        }

        body
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.fallback_body())).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Successful handler result
///
/// # Example
///
/// ```
/// use tenantry_api::response::ApiResponse;
/// use serde_json::json;
///
/// let response = ApiResponse::created("user.register", json!({ "_id": "..." }));
/// ```
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    message: Message,
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with `data`
    pub fn ok(message: impl Into<Message>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data: Some(data),
        }
    }

    /// 201 with `data`
    pub fn created(message: impl Into<Message>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// 200 without a `data` field
    pub fn message(message: impl Into<Message>) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data = match self.data.map(serde_json::to_value).transpose() {
            Ok(data) => data,
            Err(e) => return ApiError::internal(format!("Response serialization failed: {e}")).into_response(),
        };

        Envelope {
            status: self.status,
            message: self.message,
            data,
            paging: None,
            errors: Vec::new(),
        }
        .into_response()
    }
}

/// One page of a list endpoint
///
/// Renders `data` as the array, plus `_metadata.pagination` and
/// `_pagination { total, totalPage }`.
#[derive(Debug)]
pub struct PagedResponse<T> {
    message: Message,
    items: Vec<T>,
    pagination: PaginationList,
    total: i64,
}

impl<T: Serialize> PagedResponse<T> {
    pub fn new(
        message: impl Into<Message>,
        items: Vec<T>,
        pagination: PaginationList,
        total: i64,
    ) -> Self {
        Self {
            message: message.into(),
            items,
            pagination,
            total,
        }
    }
}

impl<T: Serialize> IntoResponse for PagedResponse<T> {
    fn into_response(self) -> Response {
        let data = match serde_json::to_value(&self.items) {
            Ok(data) => data,
            Err(e) => return ApiError::internal(format!("Response serialization failed: {e}")).into_response(),
        };

        let paging = Paging {
            meta: self.pagination.meta(),
            totals: PaginationTotals {
                total: self.total,
                total_page: self.pagination.total_page(self.total),
            },
        };

        Envelope {
            status: StatusCode::OK,
            message: self.message,
            data: Some(data),
            paging: Some(paging),
            errors: Vec::new(),
        }
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tenantry_shared::pagination::{PaginationOptions, PaginationQuery};

    fn messages() -> MessageService {
        MessageService::new("en", &["en".to_string(), "id".to_string()]).unwrap()
    }

    fn metadata(languages: &[&str]) -> Metadata {
        Metadata {
            languages: languages.iter().map(|l| l.to_string()).collect(),
            timestamp: 1_700_000_000_000,
            timezone: "UTC".to_string(),
            request_id: "00000000-0000-0000-0000-000000000000".to_string(),
            path: "/hello".to_string(),
            version: "1".to_string(),
            repo_version: "0.1.0".to_string(),
            pagination: None,
        }
    }

    #[test]
    fn test_render_success() {
        let envelope = Envelope::new(
            StatusCode::OK,
            Message::new("app.hello").with("serviceName", "tenantry"),
        )
        .with_data(json!({ "a": 1 }));

        let body = envelope.render(&messages(), metadata(&["en"]));

        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["message"], "This is tenantry service");
        assert_eq!(body["_metadata"]["path"], "/hello");
        assert_eq!(body["_metadata"]["repoVersion"], "0.1.0");
        assert!(body["_metadata"].get("pagination").is_none());
        assert_eq!(body["data"]["a"], 1);
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn test_render_validation_errors_localized() {
        let errors = vec![RequestErrorItem {
            property: "username".to_string(),
            message: Message::new("request.error.required").with("property", "username"),
        }];
        let envelope = Envelope::new(StatusCode::UNPROCESSABLE_ENTITY, "request.validation".into())
            .with_errors(errors);
        assert!(envelope.is_error());

        let body = envelope.render(&messages(), metadata(&["en"]));

        assert_eq!(body["statusCode"], 422);
        assert_eq!(body["errors"][0]["property"], "username");
        assert_eq!(body["errors"][0]["message"], "username is required");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_paged_response_fallback_body() {
        let pagination = PaginationOptions::new(&["name"], &["created_at"]).resolve(&PaginationQuery {
            per_page: Some("2".to_string()),
            ..Default::default()
        });

        let response = PagedResponse::new("apiKey.list", vec![1, 2], pagination, 5).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let envelope = response.extensions().get::<Envelope>().cloned().unwrap();
        let paging = envelope.paging.unwrap();
        assert_eq!(paging.totals.total, 5);
        assert_eq!(paging.totals.total_page, 3);
        assert_eq!(paging.meta.per_page, 2);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "apiKey.list");
        assert_eq!(body["_pagination"]["totalPage"], 3);
        assert_eq!(body["data"], json!([1, 2]));
    }

    #[test]
    fn test_message_only_response_has_no_data() {
        let response = ApiResponse::message("apiKey.delete").into_response();
        let envelope = response.extensions().get::<Envelope>().unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message.key, "apiKey.delete");
    }
}
