//! # Outcomes and Envelopes
//!
//! Every pipeline call resolves to an [`ApiOutcome`]; nothing is thrown past
//! the pipeline boundary.
//!
//! ## Three Disjoint Cases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ApiOutcome<T>                                   │
//! │                                                                         │
//! │  Success { data, from_cache }   response (or cache hit) decoded to T    │
//! │  Queued  { queue_id }           write accepted for replay when online   │
//! │  Failed(ApiFailure)             terminal failure with a typed code      │
//! │                                                                         │
//! │                      into_envelope()                                    │
//! │                            │                                            │
//! │                            ▼                                            │
//! │  { data?, error?, code?, message?, fromCache? }   flat shape for the UI │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A queued write is neither a success nor a failure; in the flat envelope it
//! appears with `code: "OFFLINE_QUEUED"`, matching what UI code already
//! checks for.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ApiFailure, ErrorCode};

// =============================================================================
// Api Outcome
// =============================================================================

/// Result of one pipeline call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Success { data: T, from_cache: bool },
    Queued { queue_id: String },
    Failed(ApiFailure),
}

impl<T> ApiOutcome<T> {
    /// A fresh network response.
    pub fn success(data: T) -> Self {
        ApiOutcome::Success {
            data,
            from_cache: false,
        }
    }

    /// A response served from the cache.
    pub fn cached(data: T) -> Self {
        ApiOutcome::Success {
            data,
            from_cache: true,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::Success { .. })
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, ApiOutcome::Queued { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ApiOutcome::Failed(_))
    }

    pub fn is_from_cache(&self) -> bool {
        matches!(self, ApiOutcome::Success { from_cache: true, .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiOutcome::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ApiOutcome::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            ApiOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// The failure code, with queued writes reported as `OFFLINE_QUEUED`.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ApiOutcome::Success { .. } => None,
            ApiOutcome::Queued { .. } => Some(ErrorCode::OfflineQueued),
            ApiOutcome::Failed(failure) => Some(failure.code.clone()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiOutcome<U> {
        match self {
            ApiOutcome::Success { data, from_cache } => ApiOutcome::Success {
                data: f(data),
                from_cache,
            },
            ApiOutcome::Queued { queue_id } => ApiOutcome::Queued { queue_id },
            ApiOutcome::Failed(failure) => ApiOutcome::Failed(failure),
        }
    }

    /// Converts into a plain `Result`; a queued write becomes
    /// `Err(OFFLINE_QUEUED)`.
    pub fn into_result(self) -> Result<T, ApiFailure> {
        match self {
            ApiOutcome::Success { data, .. } => Ok(data),
            ApiOutcome::Queued { .. } => Err(ApiFailure::offline_queued()),
            ApiOutcome::Failed(failure) => Err(failure),
        }
    }

    /// Renders the flat UI envelope.
    pub fn into_envelope(self) -> ResponseEnvelope<T> {
        match self {
            ApiOutcome::Success { data, from_cache } => ResponseEnvelope {
                data: Some(data),
                from_cache: from_cache.then_some(true),
                ..Default::default()
            },
            ApiOutcome::Queued { .. } => {
                let failure = ApiFailure::offline_queued();
                ResponseEnvelope {
                    error: Some(failure.error),
                    code: Some(failure.code.to_string()),
                    ..Default::default()
                }
            }
            ApiOutcome::Failed(failure) => ResponseEnvelope {
                error: Some(failure.error),
                code: Some(failure.code.to_string()),
                message: failure.message,
                ..Default::default()
            },
        }
    }
}

impl<T> From<Result<T, ApiFailure>> for ApiOutcome<T> {
    fn from(result: Result<T, ApiFailure>) -> Self {
        match result {
            Ok(data) => ApiOutcome::success(data),
            Err(failure) => ApiOutcome::Failed(failure),
        }
    }
}

impl ApiOutcome<serde_json::Value> {
    /// Decodes a raw JSON outcome into the endpoint's response type.
    ///
    /// A body that does not match `T` becomes `INVALID_PAYLOAD`.
    pub fn decode<T: DeserializeOwned>(self) -> ApiOutcome<T> {
        match self {
            ApiOutcome::Success { data, from_cache } => match serde_json::from_value(data) {
                Ok(data) => ApiOutcome::Success { data, from_cache },
                Err(e) => ApiOutcome::Failed(ApiFailure::invalid_payload(e.to_string())),
            },
            ApiOutcome::Queued { queue_id } => ApiOutcome::Queued { queue_id },
            ApiOutcome::Failed(failure) => ApiOutcome::Failed(failure),
        }
    }
}

// =============================================================================
// Response Envelope
// =============================================================================

/// Flat response shape: exactly one of `data` / `error` is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_cache: Option<bool>,
}

impl<T> Default for ResponseEnvelope<T> {
    fn default() -> Self {
        ResponseEnvelope {
            data: None,
            error: None,
            code: None,
            message: None,
            from_cache: None,
        }
    }
}
