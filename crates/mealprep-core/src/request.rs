//! # Request Options
//!
//! Everything a caller hands to the request pipeline besides the endpoint.
//!
//! ## Behavior Flags
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        RequestOptions                                   │
//! │                                                                         │
//! │  method      GET | POST | PUT | PATCH | DELETE                          │
//! │  body        JSON value, or multipart parts (file uploads)              │
//! │  headers     extra headers, sent verbatim                               │
//! │                                                                         │
//! │  skip_auth     no Authorization header, never refreshes                 │
//! │  skip_refresh  a TOKEN_EXPIRED 401 is surfaced instead of refreshed     │
//! │  skip_cache    reads bypass the response cache (lookup and store)       │
//! │  skip_retry    no backoff resubmission on timeout / 408 / 429 / 5xx     │
//! │  cache_key     replaces the computed fingerprint                        │
//! │  cache_ttl_ms  replaces the default cache TTL for this read             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Options are persisted with offline queue items, so every field is
//! serializable.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// HTTP Method
// =============================================================================

/// HTTP verb of a pipeline request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Returns true for idempotent reads (cached and deduplicated).
    pub fn is_read(&self) -> bool {
        matches!(self, HttpMethod::Get)
    }

    /// Returns true for mutations (queued offline, invalidate the cache).
    pub fn is_write(&self) -> bool {
        !self.is_read()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Request Body
// =============================================================================

/// One part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPart {
    /// Form field name.
    pub name: String,

    /// File name reported to the server (file parts only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// MIME type of this part (e.g. "image/jpeg").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Raw part content.
    pub bytes: Vec<u8>,
}

impl FormPart {
    /// A plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        FormPart {
            name: name.into(),
            file_name: None,
            content_type: None,
            bytes: value.into().into_bytes(),
        }
    }

    /// A file field.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        FormPart {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            bytes,
        }
    }
}

/// Request body.
///
/// JSON bodies are sent with `Content-Type: application/json`; multipart
/// bodies let the transport choose the content type (it carries the
/// boundary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

impl RequestBody {
    pub fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::Multipart(_))
    }
}

// =============================================================================
// Request Options
// =============================================================================

/// Options for one pipeline request.
///
/// ## Example
/// ```rust
/// use mealprep_core::request::{HttpMethod, RequestOptions};
/// use serde_json::json;
///
/// let options = RequestOptions::post(json!({ "name": "Oats" })).skip_retry();
/// assert_eq!(options.method, HttpMethod::Post);
/// assert!(options.skip_retry);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    #[serde(default)]
    pub method: HttpMethod,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub skip_auth: bool,

    #[serde(default)]
    pub skip_refresh: bool,

    #[serde(default)]
    pub skip_cache: bool,

    #[serde(default)]
    pub skip_retry: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl_ms: Option<u64>,
}

impl RequestOptions {
    pub fn new(method: HttpMethod) -> Self {
        RequestOptions {
            method,
            ..Default::default()
        }
    }

    pub fn get() -> Self {
        Self::new(HttpMethod::Get)
    }

    pub fn post(body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Post).with_json(body)
    }

    pub fn put(body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Put).with_json(body)
    }

    pub fn patch(body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Patch).with_json(body)
    }

    pub fn delete() -> Self {
        Self::new(HttpMethod::Delete)
    }

    /// Sets a JSON body.
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Sets a multipart body.
    pub fn with_multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = Some(RequestBody::Multipart(parts));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_ms = Some(ttl.as_millis() as u64);
        self
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    pub fn skip_refresh(mut self) -> Self {
        self.skip_refresh = true;
        self
    }

    pub fn skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    pub fn skip_retry(mut self) -> Self {
        self.skip_retry = true;
        self
    }

    /// Per-request cache TTL override.
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_ms.map(Duration::from_millis)
    }

    /// True when the body is a JSON document (or absent).
    pub fn is_json(&self) -> bool {
        !matches!(self.body, Some(RequestBody::Multipart(_)))
    }
}

// =============================================================================
// Fingerprints
// =============================================================================

/// Computes the cache/dedup key of a request.
///
/// Format: `METHOD:endpoint:body`. The endpoint keeps its query string, so
/// two reads of the same path with different queries never share an entry.
/// A caller-supplied `cache_key` wins over the computed value.
pub fn fingerprint(endpoint: &str, options: &RequestOptions) -> String {
    if let Some(key) = &options.cache_key {
        return key.clone();
    }

    let body = match &options.body {
        None => String::new(),
        Some(RequestBody::Json(value)) => value.to_string(),
        Some(RequestBody::Multipart(parts)) => {
            let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
            format!("multipart[{}]", names.join(","))
        }
    };

    format!("{}:{}:{}", options.method, endpoint, body)
}

/// The resource path of an endpoint (query string stripped).
///
/// Successful writes invalidate every cache entry whose key contains this
/// path.
pub fn resource_path(endpoint: &str) -> &str {
    endpoint.split(['?', '#']).next().unwrap_or(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_classification() {
        assert!(HttpMethod::Get.is_read());
        assert!(HttpMethod::Post.is_write());
        assert!(HttpMethod::Delete.is_write());
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
    }

    #[test]
    fn test_fingerprint_includes_query_string() {
        let a = fingerprint("/meals?date=2024-05-01", &RequestOptions::get());
        let b = fingerprint("/meals?date=2024-05-02", &RequestOptions::get());
        assert_ne!(a, b);
        assert!(a.starts_with("GET:/meals"));
    }

    #[test]
    fn test_fingerprint_includes_body() {
        let a = fingerprint("/meals", &RequestOptions::post(json!({"name": "a"})));
        let b = fingerprint("/meals", &RequestOptions::post(json!({"name": "b"})));
        assert_ne!(a, b);
        assert_eq!(a, r#"POST:/meals:{"name":"a"}"#);
    }

    #[test]
    fn test_custom_cache_key_wins() {
        let options = RequestOptions::get().with_cache_key("patterns-all");
        assert_eq!(fingerprint("/patterns", &options), "patterns-all");
    }

    #[test]
    fn test_resource_path_strips_query() {
        assert_eq!(resource_path("/meals/12?expand=items"), "/meals/12");
        assert_eq!(resource_path("/inventory"), "/inventory");
    }

    #[test]
    fn test_options_serde_uses_camel_case() {
        let options = RequestOptions::post(json!({"qty": 2}))
            .skip_retry()
            .with_cache_ttl(Duration::from_secs(5));
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["method"], "POST");
        assert_eq!(value["skipRetry"], true);
        assert_eq!(value["cacheTtlMs"], 5000);

        let back: RequestOptions = serde_json::from_value(value).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn test_multipart_is_not_json() {
        let options = RequestOptions::new(HttpMethod::Post)
            .with_multipart(vec![FormPart::file("photo", "a.jpg", "image/jpeg", vec![1, 2])]);
        assert!(!options.is_json());
        assert_eq!(
            fingerprint("/meals/1/photo", &options),
            "POST:/meals/1/photo:multipart[photo]"
        );
    }
}
