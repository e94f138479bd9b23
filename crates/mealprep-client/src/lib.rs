//! # mealprep-client: Network Resilience Layer for the Mealprep App
//!
//! Every call the app makes to the meal-planning backend goes through this
//! crate. It keeps the app usable on flaky mobile connections: reads are
//! cached and deduplicated, expired sessions are refreshed once for all
//! waiting callers, transient failures are retried with backoff, and writes
//! made offline are queued and replayed later.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Network Layer                               │
//! │                                                                         │
//! │   Domain APIs (auth, patterns, meals, inventory, prep)                  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    ApiClient (request pipeline)                   │  │
//! │  │                                                                  │  │
//! │  │  ResponseCache   InFlightRegistry   RefreshCoordinator           │  │
//! │  │  (TTL, reads)    (dedup reads)      (one refresh, N waiters)     │  │
//! │  │                                                                  │  │
//! │  │  TokenStore      RetryPolicy        OfflineQueue                 │  │
//! │  │  (persisted)     (backoff)          (persisted FIFO of writes)   │  │
//! │  └──────────────┬──────────────────────────────────┬────────────────┘  │
//! │                 │                                  │                    │
//! │                 ▼                                  ▼                    │
//! │  ┌────────────────────────────┐   ┌──────────────────────────────────┐ │
//! │  │ HttpTransport (reqwest)    │   │ KeyValueStore (mealprep-store)   │ │
//! │  └────────────────────────────┘   └──────────────────────────────────┘ │
//! │                                                                         │
//! │  SyncCoordinator: connectivity edges + interval ──► drain queue         │
//! │                   manual full sync ──► drain, pull, last_sync_at        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`pipeline`] - `ApiClient`, the request pipeline
//! - [`api`] - Typed domain endpoints
//! - [`cache`] - Response cache with TTL
//! - [`inflight`] - Concurrent read deduplication
//! - [`refresh`] - Single-flight token refresh
//! - [`token_store`] - Persisted token pair
//! - [`offline_queue`] - Persisted queue of offline writes
//! - [`sync`] - `SyncCoordinator` and its background loop
//! - [`transport`] - HTTP transport trait and reqwest implementation
//! - [`config`] - Client configuration (TOML + env)
//! - [`error`] - Client error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mealprep_client::{ApiClient, ClientConfig, SyncCoordinator};
//! use mealprep_store::{SqliteStore, StoreConfig};
//!
//! let config = ClientConfig::load(None)?;
//! let storage = Arc::new(SqliteStore::new(StoreConfig::new(config.database_path())).await?);
//!
//! let client = ApiClient::builder(config).with_storage(storage.clone()).build()?;
//! client.initialize().await?;
//!
//! let coordinator = Arc::new(SyncCoordinator::new(client.clone(), storage));
//! coordinator.initialize().await?;
//! let handle = coordinator.clone().spawn(network_rx);
//!
//! match client.meals().list(None).await {
//!     ApiOutcome::Success { data, from_cache } => { /* render */ }
//!     ApiOutcome::Queued { .. } => unreachable!("reads are never queued"),
//!     ApiOutcome::Failed(failure) => eprintln!("{failure}"),
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod inflight;
pub mod offline_queue;
pub mod pipeline;
pub mod refresh;
pub mod sync;
pub mod token_store;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use api::{AuthApi, InventoryApi, MealsApi, PatternsApi, PrepApi};
pub use cache::ResponseCache;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use inflight::InFlightRegistry;
pub use offline_queue::OfflineQueue;
pub use pipeline::{ApiClient, ApiClientBuilder};
pub use refresh::RefreshCoordinator;
pub use sync::{NoOpEmitter, SyncCoordinator, SyncEventEmitter, SyncHandle, SyncReport, SyncStatus};
pub use token_store::TokenStore;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};

pub use mealprep_core::{ApiFailure, ApiOutcome, ErrorCode, NetworkState, RequestOptions};
