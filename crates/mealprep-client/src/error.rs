//! # Client Error Types
//!
//! Errors of the client's own operations (config, storage, sync control).
//! Failures of individual API calls never use this type; they travel as
//! `ApiOutcome::Failed(ApiFailure)`.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Storage      │  │     Sync control        │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Storage        │  │  Offline                │ │
//! │  │  InvalidUrl     │  │  Serialization  │  │  SyncInProgress         │ │
//! │  │  ConfigLoad/Save│  │                 │  │  Api (from an outcome)  │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mealprep_core::ApiFailure;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Client operation errors.
#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Durable storage failed.
    ///
    /// ## When This Occurs
    /// - SQLite file unwritable or disk full
    /// - Store closed during shutdown
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    // =========================================================================
    // Sync Control Errors
    // =========================================================================
    /// A full sync was requested while offline.
    #[error("Cannot sync while offline")]
    Offline,

    /// A full sync was requested while another sync pass was running.
    #[error("A sync is already in progress")]
    SyncInProgress,

    /// An API call failed during a client operation.
    #[error("API call failed: {0}")]
    Api(#[from] ApiFailure),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<mealprep_store::StoreError> for ClientError {
    fn from(err: mealprep_store::StoreError) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl ClientError {
    /// Returns true if the operation may succeed when tried again later.
    ///
    /// ## Retryable Errors
    /// - Offline / sync already running
    /// - Transport-level API failures (network, timeout)
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Offline | ClientError::SyncInProgress => true,
            ClientError::Api(failure) => failure.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidConfig(_)
                | ClientError::InvalidUrl(_)
                | ClientError::ConfigLoadFailed(_)
                | ClientError::ConfigSaveFailed(_)
        )
    }
}
