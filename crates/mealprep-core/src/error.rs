//! # Error Types
//!
//! The failure taxonomy every pipeline call reports through.
//!
//! ## Error Codes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ErrorCode                                       │
//! │                                                                         │
//! │  Produced by the client itself                                          │
//! │  ├── NETWORK_ERROR    - connection failed, retries exhausted            │
//! │  ├── TIMEOUT          - request exceeded the configured timeout         │
//! │  ├── OFFLINE_QUEUED   - write was persisted for later replay            │
//! │  ├── SESSION_EXPIRED  - refresh failed, tokens were cleared             │
//! │  ├── INVALID_PAYLOAD  - response body did not match the expected type   │
//! │  └── STORAGE_ERROR    - durable storage rejected a write                │
//! │                                                                         │
//! │  Reported by the server                                                 │
//! │  ├── TOKEN_EXPIRED    - 401 whose body says the access token expired    │
//! │  └── <anything>       - body `code` verbatim, else HTTP_<status>        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `ApiFailure` is a value, not an exception: it is cloned to every waiter of
//! a deduplicated request and carried inside `ApiOutcome::Failed`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// =============================================================================
// Error Code
// =============================================================================

/// Machine-readable failure code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NetworkError,
    Timeout,
    OfflineQueued,
    SessionExpired,
    TokenExpired,
    InvalidPayload,
    StorageError,
    /// Any other code, reported by the server or derived from the status.
    Server(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::OfflineQueued => "OFFLINE_QUEUED",
            ErrorCode::SessionExpired => "SESSION_EXPIRED",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::Server(code) => code,
        }
    }

    /// Code used when the server body carries no `code`.
    pub fn from_status(status: u16) -> Self {
        ErrorCode::Server(format!("HTTP_{status}"))
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "NETWORK_ERROR" => ErrorCode::NetworkError,
            "TIMEOUT" => ErrorCode::Timeout,
            "OFFLINE_QUEUED" => ErrorCode::OfflineQueued,
            "SESSION_EXPIRED" => ErrorCode::SessionExpired,
            "TOKEN_EXPIRED" => ErrorCode::TokenExpired,
            "INVALID_PAYLOAD" => ErrorCode::InvalidPayload,
            "STORAGE_ERROR" => ErrorCode::StorageError,
            other => ErrorCode::Server(other.to_string()),
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        ErrorCode::from(code.as_str())
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(ErrorCode::from(code))
    }
}

// =============================================================================
// API Failure
// =============================================================================

/// A failed pipeline call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {error}")]
pub struct ApiFailure {
    pub code: ErrorCode,

    /// Human-readable error text.
    pub error: String,

    /// Optional extra detail from the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// HTTP status, when the failure came from a response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ApiFailure {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        ApiFailure {
            code,
            error: error.into(),
            message: None,
            status: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn network(detail: impl Into<String>) -> Self {
        ApiFailure::new(ErrorCode::NetworkError, "Network request failed").with_message(detail)
    }

    pub fn timeout() -> Self {
        ApiFailure::new(ErrorCode::Timeout, "Request timed out")
    }

    pub fn session_expired() -> Self {
        ApiFailure::new(
            ErrorCode::SessionExpired,
            "Session expired, please sign in again",
        )
    }

    pub fn token_expired() -> Self {
        ApiFailure::new(ErrorCode::TokenExpired, "Access token expired").with_status(401)
    }

    pub fn offline_queued() -> Self {
        ApiFailure::new(
            ErrorCode::OfflineQueued,
            "Request queued for when connection is restored",
        )
    }

    pub fn invalid_payload(detail: impl Into<String>) -> Self {
        ApiFailure::new(ErrorCode::InvalidPayload, "Unexpected response payload")
            .with_message(detail)
    }

    pub fn storage(detail: impl Into<String>) -> Self {
        ApiFailure::new(ErrorCode::StorageError, "Durable storage failed").with_message(detail)
    }

    /// Builds a failure from a non-success HTTP response.
    ///
    /// Reads `error`, `code` and `message` from the body when it is a JSON
    /// object. Missing code falls back to `HTTP_<status>`, missing error text
    /// to `Request failed with status <status>`.
    pub fn from_response(status: u16, body: &serde_json::Value) -> Self {
        let field = |name: &str| {
            body.get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        let code = field("code")
            .map(ErrorCode::from)
            .unwrap_or_else(|| ErrorCode::from_status(status));
        let error = field("error")
            .or_else(|| field("detail"))
            .unwrap_or_else(|| format!("Request failed with status {status}"));

        ApiFailure {
            code,
            error,
            message: field("message"),
            status: Some(status),
        }
    }

    /// Returns true for failures produced by the transport layer.
    pub fn is_retryable(&self) -> bool {
        matches!(self.code, ErrorCode::NetworkError | ErrorCode::Timeout)
    }

    pub fn is_session_expired(&self) -> bool {
        self.code == ErrorCode::SessionExpired
    }
}
