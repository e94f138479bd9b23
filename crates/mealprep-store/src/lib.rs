//! # mealprep-store: Durable Storage for the Mealprep Client
//!
//! The "persistent key-value store" collaborator of the network layer. The
//! client crate only sees `dyn KeyValueStore`; this crate decides where the
//! bytes live.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Mealprep Client Data Flow                          │
//! │                                                                         │
//! │  TokenStore / OfflineQueue / SyncCoordinator                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 mealprep-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ KeyValueStore │    │  SqliteStore  │    │  Migrations  │  │   │
//! │  │   │   (kv.rs)     │◄───│  (sqlite.rs)  │    │  (embedded)  │  │   │
//! │  │   │  MemoryStore  │    │  SqlitePool   │    │ 001_kv.sql   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mealprep_store::{keys, KeyValueStore, SqliteStore, StoreConfig};
//!
//! let store = SqliteStore::new(StoreConfig::new("mealprep.db")).await?;
//! store.set(keys::LAST_SYNC_AT, "\"2024-05-01T10:00:00Z\"").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod kv;
pub mod migrations;
pub mod sqlite;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use kv::{keys, load_json, save_json, KeyValueStore, MemoryStore};
pub use sqlite::{SqliteStore, StoreConfig};
