//! # mealprep-core: Pure Types for the Mealprep Client
//!
//! This crate holds every type and policy of the network layer that can be
//! expressed without I/O: request options and their fingerprints, the retry
//! policy, the token pair, the outcome/envelope returned by every pipeline
//! call, the offline queue item and the domain payloads.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Mealprep Client Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                Domain APIs (auth, patterns, meals…)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       mealprep-client (pipeline, refresh, cache, queue, sync)   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mealprep-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  request  │  │   retry   │  │ envelope  │  │   token   │  │   │
//! │  │   │ Options   │  │  Policy   │  │ Outcome   │  │ TokenPair │  │   │
//! │  │   │Fingerprint│  │  Backoff  │  │ Envelope  │  │ JWT exp   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO STORAGE • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`request`] - HTTP method, request options, fingerprints
//! - [`retry`] - Retryable statuses, retry budget and backoff bounds
//! - [`error`] - Failure taxonomy (`ErrorCode`, `ApiFailure`)
//! - [`envelope`] - `ApiOutcome` and the flat `ResponseEnvelope`
//! - [`token`] - Access/refresh token pair
//! - [`queue`] - Offline queue item and drain report
//! - [`network`] - Connectivity state
//! - [`models`] - Domain payloads (patterns, meals, inventory, prep)
//!
//! ## Example Usage
//!
//! ```rust
//! use mealprep_core::request::{fingerprint, RequestOptions};
//! use mealprep_core::retry::RetryPolicy;
//!
//! let key = fingerprint("/patterns?active=true", &RequestOptions::get());
//! assert_eq!(key, "GET:/patterns?active=true:");
//!
//! let policy = RetryPolicy::default();
//! assert!(policy.should_retry_status(503, 2));
//! assert!(!policy.should_retry_status(503, 3));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod envelope;
pub mod error;
pub mod models;
pub mod network;
pub mod queue;
pub mod request;
pub mod retry;
pub mod token;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use envelope::{ApiOutcome, ResponseEnvelope};
pub use error::{ApiFailure, ErrorCode};
pub use network::NetworkState;
pub use queue::{DrainReport, QueuedRequest};
pub use request::{fingerprint, resource_path, FormPart, HttpMethod, RequestBody, RequestOptions};
pub use retry::RetryPolicy;
pub use token::TokenPair;
