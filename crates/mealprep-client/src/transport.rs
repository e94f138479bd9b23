//! # HTTP Transport
//!
//! One request in, one response (or transport error) out. No retries, no
//! auth, no caching: the pipeline owns all of that.
//!
//! ## Seam
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        HttpTransport                                    │
//! │                                                                         │
//! │   ApiClient ──► HttpRequest { method, url, headers, body }              │
//! │                        │                                                │
//! │                        ▼                                                │
//! │              ┌────────────────────┐                                     │
//! │              │  ReqwestTransport  │   (or a scripted test transport)    │
//! │              └─────────┬──────────┘                                     │
//! │                        ▼                                                │
//! │   HttpResponse { status, body: JSON }  |  TransportError                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Timeouts are enforced by the caller around `send`; dropping the future
//! aborts the in-flight request.

use std::time::Duration;

use async_trait::async_trait;
use mealprep_core::{HttpMethod, RequestBody};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// A fully resolved outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

/// A received response with its body parsed as JSON.
///
/// Non-JSON bodies are kept as a JSON string; empty bodies become `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// A 401 whose body carries the `TOKEN_EXPIRED` code.
    pub fn is_token_expired(&self) -> bool {
        self.status == 401
            && self.body.get("code").and_then(|c| c.as_str()) == Some("TOKEN_EXPIRED")
    }
}

/// Failure below HTTP: nothing usable came back.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    /// The request could not be built; nothing was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Sends one HTTP request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// =============================================================================
// Reqwest Transport
// =============================================================================

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        ReqwestTransport { http }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn to_multipart(parts: Vec<mealprep_core::FormPart>) -> Result<reqwest::multipart::Form, TransportError> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        let mut field = reqwest::multipart::Part::bytes(part.bytes);
        if let Some(file_name) = part.file_name {
            field = field.file_name(file_name);
        }
        if let Some(content_type) = part.content_type {
            field = field.mime_str(&content_type).map_err(|e| {
                TransportError::InvalidRequest(format!("invalid content type: {e}"))
            })?;
        }
        form = form.part(part.name, field);
    }
    Ok(form)
}

/// Parses a response body: JSON when possible, else the raw text.
pub(crate) fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .http
            .request(to_reqwest_method(request.method), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match request.body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Multipart(parts)) => builder.multipart(to_multipart(parts)?),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(Duration::ZERO)
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        debug!(status, bytes = text.len(), url = %request.url, "HTTP response received");

        Ok(HttpResponse {
            status,
            body: parse_body(&text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealprep_core::FormPart;
    use serde_json::json;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("  "), Value::Null);
        assert_eq!(parse_body(r#"{"ok":true}"#), json!({"ok": true}));
        assert_eq!(parse_body("Bad Gateway"), json!("Bad Gateway"));
    }

    #[test]
    fn test_invalid_part_mime_rejected() {
        let parts = vec![FormPart::file("photo", "a.jpg", "not a mime", vec![1])];
        let err = to_multipart(parts).unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));

        let parts = vec![FormPart::file("photo", "a.jpg", "image/jpeg", vec![1])];
        assert!(to_multipart(parts).is_ok());
    }

    #[test]
    fn test_token_expired_detection() {
        let expired = HttpResponse {
            status: 401,
            body: json!({"error": "expired", "code": "TOKEN_EXPIRED"}),
        };
        assert!(expired.is_token_expired());

        let invalid = HttpResponse {
            status: 401,
            body: json!({"error": "bad credentials", "code": "INVALID_CREDENTIALS"}),
        };
        assert!(!invalid.is_token_expired());

        let forbidden = HttpResponse {
            status: 403,
            body: json!({"code": "TOKEN_EXPIRED"}),
        };
        assert!(!forbidden.is_token_expired());
    }

    #[test]
    fn test_multipart_conversion() {
        let form = to_multipart(vec![
            mealprep_core::FormPart::text("caption", "Lunch"),
            mealprep_core::FormPart::file("photo", "lunch.jpg", "image/jpeg", vec![0xff, 0xd8]),
        ]);
        assert!(form.is_ok());

        let bad = to_multipart(vec![mealprep_core::FormPart::file(
            "photo",
            "x",
            "not a mime",
            vec![],
        )]);
        assert!(bad.is_err());
    }
}
