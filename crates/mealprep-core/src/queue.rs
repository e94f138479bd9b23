//! # Offline Queue Types
//!
//! A write attempted while offline becomes a [`QueuedRequest`]; each drain
//! pass produces a [`DrainReport`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::request::RequestOptions;

/// A write waiting for connectivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRequest {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Endpoint relative to the API base URL.
    pub endpoint: String,

    /// Original request options (method, body, headers, flags).
    pub options: RequestOptions,

    /// When the write was first attempted.
    pub timestamp: DateTime<Utc>,

    /// Failed replay attempts so far.
    #[serde(default)]
    pub retry_count: u32,

    /// Error text of the latest failed replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueuedRequest {
    pub fn new(endpoint: impl Into<String>, options: RequestOptions) -> Self {
        QueuedRequest {
            id: uuid::Uuid::new_v4().to_string(),
            endpoint: endpoint.into(),
            options,
            timestamp: Utc::now(),
            retry_count: 0,
            last_error: None,
        }
    }
}

/// Result of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DrainReport {
    /// Items replayed in this pass.
    pub processed: u32,

    /// Items replayed successfully and removed.
    pub succeeded: u32,

    /// Items dropped after exhausting their retries.
    pub failed: u32,

    /// Items kept for the next pass.
    pub retained: u32,

    /// True when the pass did not run because another drain was active.
    pub skipped: bool,
}

impl DrainReport {
    pub fn skipped() -> Self {
        DrainReport {
            skipped: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_item_starts_fresh() {
        let item = QueuedRequest::new("/meals", RequestOptions::post(json!({"name": "Chili"})));
        assert_eq!(item.retry_count, 0);
        assert!(item.last_error.is_none());
        assert!(uuid::Uuid::parse_str(&item.id).is_ok());
    }

    #[test]
    fn test_item_survives_persistence_format() {
        let item = QueuedRequest::new("/inventory/3", RequestOptions::delete());
        let json = serde_json::to_string(&vec![item.clone()]).unwrap();
        assert!(json.contains("\"retryCount\":0"));

        let back: Vec<QueuedRequest> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![item]);
    }
}
