/// Localized messages
///
/// Every response message and error is addressed by a dotted key such as
/// `user.error.notFound`. Bundles are nested JSON objects compiled into the
/// binary and flattened into `key -> template` maps at startup. Templates
/// may contain `{name}` placeholders filled from message properties.
///
/// # Example
///
/// ```
/// use tenantry_shared::message::{Message, MessageService};
///
/// let messages = MessageService::new("en", &["en".to_string(), "id".to_string()]).unwrap();
/// let languages = messages.filter_languages(&["id".to_string(), "fr".to_string()]);
///
/// let hello = Message::new("app.hello").with("serviceName", "tenantry");
/// assert_eq!(messages.render(&hello, &languages), "Ini adalah layanan tenantry");
/// ```

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Header carrying the caller's preferred languages, comma separated
pub const CUSTOM_LANGUAGE_HEADER: &str = "x-custom-lang";

/// Fallback key for a validation rule without its own message
pub const REQUEST_ERROR_FALLBACK: &str = "request.error.invalid";

const BUNDLES: &[(&str, &str)] = &[
    ("en", include_str!("../../languages/en.json")),
    ("id", include_str!("../../languages/id.json")),
];

/// Error type for loading message bundles
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Language bundle {language} is not valid JSON: {source}")]
    InvalidBundle {
        language: String,
        source: serde_json::Error,
    },

    #[error("Default language {0} is not available")]
    UnknownLanguage(String),
}

/// Interpolation values for a message template
pub type MessageProperties = BTreeMap<String, String>;

/// A message key with its interpolation properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub key: String,
    pub properties: MessageProperties,
}

impl Message {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            properties: MessageProperties::new(),
        }
    }

    /// Adds one `{name}` substitution
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.properties.insert(name.into(), value.to_string());
        self
    }
}

impl From<&str> for Message {
    fn from(key: &str) -> Self {
        Message::new(key)
    }
}

/// A failed rule on one request field, before localization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestErrorItem {
    pub property: String,
    pub message: Message,
}

/// A failed rule on one request field, localized for the response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorMessage {
    pub property: String,
    pub message: String,
}

/// Flattened language bundles
#[derive(Debug, Clone)]
pub struct MessageService {
    default_language: String,
    available_languages: Vec<String>,
    bundles: HashMap<String, HashMap<String, String>>,
}

impl MessageService {
    /// Loads the compiled-in bundles
    ///
    /// Requested languages without a bundle are dropped.
    ///
    /// # Errors
    ///
    /// Fails if a bundle is not valid JSON or `default_language` is not among
    /// the resulting available languages.
    pub fn new(default_language: &str, available: &[String]) -> Result<Self, MessageError> {
        let mut bundles = HashMap::new();

        for (language, raw) in BUNDLES {
            let value: Value =
                serde_json::from_str(raw).map_err(|source| MessageError::InvalidBundle {
                    language: language.to_string(),
                    source,
                })?;

            let mut flat = HashMap::new();
            flatten("", &value, &mut flat);
            bundles.insert(language.to_string(), flat);
        }

        let mut available_languages: Vec<String> = Vec::new();
        for language in available {
            let language = language.trim();
            if bundles.contains_key(language) && !available_languages.iter().any(|l| l == language)
            {
                available_languages.push(language.to_string());
            }
        }

        if !available_languages.iter().any(|l| l == default_language) {
            return Err(MessageError::UnknownLanguage(default_language.to_string()));
        }

        Ok(Self {
            default_language: default_language.to_string(),
            available_languages,
            bundles,
        })
    }

    /// Default language
    pub fn language(&self) -> &str {
        &self.default_language
    }

    pub fn available_languages(&self) -> &[String] {
        &self.available_languages
    }

    /// Keeps the available languages from `custom`, in request order, once each
    pub fn filter_languages(&self, custom: &[String]) -> Vec<String> {
        let mut languages: Vec<String> = Vec::new();

        for language in custom {
            let language = language.trim();
            if self.available_languages.iter().any(|l| l == language)
                && !languages.iter().any(|l| l == language)
            {
                languages.push(language.to_string());
            }
        }

        languages
    }

    /// Languages for a raw `x-custom-lang` header value, falling back to the default
    pub fn resolve_languages(&self, header: Option<&str>) -> Vec<String> {
        let custom: Vec<String> = header
            .map(|raw| raw.split(',').map(str::to_string).collect())
            .unwrap_or_default();

        let languages = self.filter_languages(&custom);
        if languages.is_empty() {
            vec![self.default_language.clone()]
        } else {
            languages
        }
    }

    /// Looks `key` up in `languages`, then the default language
    ///
    /// Returns the key itself when no bundle has it.
    pub fn get(&self, key: &str, languages: &[String], properties: &MessageProperties) -> String {
        let template = languages
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.default_language.as_str()))
            .find_map(|language| self.bundles.get(language)?.get(key));

        match template {
            Some(template) => interpolate(template, properties),
            None => key.to_string(),
        }
    }

    pub fn render(&self, message: &Message, languages: &[String]) -> String {
        self.get(&message.key, languages, &message.properties)
    }

    /// Localizes validation failures
    pub fn request_errors(
        &self,
        items: &[RequestErrorItem],
        languages: &[String],
    ) -> Vec<ErrorMessage> {
        items
            .iter()
            .map(|item| {
                let mut message = if self.has_key(&item.message.key) {
                    item.message.clone()
                } else {
                    Message {
                        key: REQUEST_ERROR_FALLBACK.to_string(),
                        properties: item.message.properties.clone(),
                    }
                };
                message
                    .properties
                    .entry("property".to_string())
                    .or_insert_with(|| item.property.clone());

                ErrorMessage {
                    property: item.property.clone(),
                    message: self.render(&message, languages),
                }
            })
            .collect()
    }

    fn has_key(&self, key: &str) -> bool {
        self.bundles
            .get(&self.default_language)
            .is_some_and(|bundle| bundle.contains_key(key))
    }
}

/// Turns `validator` failures into `request.error.<code>` messages
///
/// Nested struct and list errors are reported under dotted property paths.
/// Rule parameters become message properties, except the rejected `value`
/// itself, which is never echoed back.
pub fn request_error_items(errors: &ValidationErrors) -> Vec<RequestErrorItem> {
    let mut items = Vec::new();
    collect_errors("", errors, &mut items);
    items.sort_by(|a, b| a.property.cmp(&b.property));
    items
}

fn collect_errors(prefix: &str, errors: &ValidationErrors, items: &mut Vec<RequestErrorItem>) {
    for (field, kind) in errors.errors() {
        let property = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let mut message = Message::new(format!("request.error.{}", error.code))
                        .with("property", &property);

                    for (name, value) in &error.params {
                        if name == "value" {
                            continue;
                        }
                        message = message.with(name.to_string(), param_to_string(value));
                    }

                    items.push(RequestErrorItem {
                        property: property.clone(),
                        message,
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_errors(&property, nested, items),
            ValidationErrorsKind::List(list) => {
                for (index, nested) in list {
                    collect_errors(&format!("{property}.{index}"), nested, items);
                }
            }
        }
    }
}

fn param_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

fn interpolate(template: &str, properties: &MessageProperties) -> String {
    let mut rendered = template.to_string();
    for (name, value) in properties {
        rendered = rendered.replace(&format!("{{{name}}}"), value);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn service() -> MessageService {
        MessageService::new("en", &["en".to_string(), "id".to_string()]).unwrap()
    }

    fn langs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unknown_default_language() {
        let result = MessageService::new("fr", &langs(&["en", "fr"]));
        assert!(matches!(result, Err(MessageError::UnknownLanguage(l)) if l == "fr"));
    }

    #[test]
    fn test_available_languages_drop_missing_bundles() {
        let service = MessageService::new("en", &langs(&["en", "fr", "en"])).unwrap();
        assert_eq!(service.available_languages(), &langs(&["en"])[..]);
        assert_eq!(service.language(), "en");
    }

    #[test]
    fn test_filter_languages() {
        let service = service();

        assert_eq!(
            service.filter_languages(&langs(&["id", "fr", "en", "id"])),
            langs(&["id", "en"])
        );
        assert!(service.filter_languages(&langs(&["fr"])).is_empty());
    }

    #[test]
    fn test_resolve_languages() {
        let service = service();

        assert_eq!(service.resolve_languages(Some("id, en")), langs(&["id", "en"]));
        assert_eq!(service.resolve_languages(Some("fr")), langs(&["en"]));
        assert_eq!(service.resolve_languages(None), langs(&["en"]));
    }

    #[test]
    fn test_get_with_fallbacks() {
        let service = service();
        let none = MessageProperties::new();

        assert_eq!(service.get("user.error.notFound", &langs(&["en"]), &none), "User not found");
        assert_eq!(
            service.get("user.error.notFound", &langs(&["id"]), &none),
            "Pengguna tidak ditemukan"
        );
        assert_eq!(service.get("no.such.key", &langs(&["id"]), &none), "no.such.key");
    }

    #[test]
    fn test_interpolation() {
        let service = service();
        let message = Message::new("app.hello").with("serviceName", "tenantry");

        assert_eq!(service.render(&message, &langs(&["en"])), "This is tenantry service");
    }

    #[derive(Debug, Validate)]
    struct Body {
        #[validate(email)]
        email: String,

        #[validate(length(min = 3, max = 100))]
        username: String,

        #[validate(custom(function = "always_fails"))]
        other: String,
    }

    fn always_fails(_: &str) -> Result<(), validator::ValidationError> {
        Err(validator::ValidationError::new("somethingElse"))
    }

    #[test]
    fn test_request_errors() {
        let errors = Body {
            email: "not-an-email".to_string(),
            username: "ab".to_string(),
            other: "x".to_string(),
        }
        .validate()
        .unwrap_err();

        let items = request_error_items(&errors);
        assert_eq!(
            items.iter().map(|i| i.property.as_str()).collect::<Vec<_>>(),
            vec!["email", "other", "username"]
        );
        assert_eq!(items[0].message.key, "request.error.email");
        assert_eq!(items[2].message.properties.get("min").map(String::as_str), Some("3"));
        assert!(!items[2].message.properties.contains_key("value"));

        let rendered = service().request_errors(&items, &langs(&["en"]));
        assert_eq!(rendered[0].message, "email must be a valid email address");
        assert_eq!(rendered[1].message, "other is invalid");
        assert_eq!(rendered[2].message, "username length is out of range");
    }
}
