//! # Key-Value Store
//!
//! The storage seam used by the token store, the offline queue and the sync
//! coordinator.
//!
//! ## Implementations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      dyn KeyValueStore                                  │
//! │                                                                         │
//! │   ┌──────────────────────┐          ┌──────────────────────┐           │
//! │   │     MemoryStore      │          │     SqliteStore      │           │
//! │   │  HashMap in RwLock   │          │  kv_store table      │           │
//! │   │  tests, ephemeral    │          │  survives restarts   │           │
//! │   └──────────────────────┘          └──────────────────────┘           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Values are strings; [`load_json`] and [`save_json`] layer serde on top.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::StoreResult;

/// Well-known keys.
pub mod keys {
    /// Persisted token pair.
    pub const AUTH_TOKENS: &str = "mealprep.auth.tokens";

    /// Persisted offline queue (JSON array, FIFO order).
    pub const OFFLINE_QUEUE: &str = "mealprep.offline.queue";

    /// Timestamp of the last completed full sync.
    pub const LAST_SYNC_AT: &str = "mealprep.sync.last_sync_at";
}

/// Durable string key-value storage.
///
/// `set` replaces the whole value; `remove` of a missing key is not an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Reads and decodes a JSON value.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> StoreResult<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encodes and writes a JSON value.
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}

// =============================================================================
// Memory Store
// =============================================================================

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Marker {
        count: u32,
    }

    #[tokio::test]
    async fn test_memory_store_basic_ops() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);

        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len().await, 1);

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryStore::new();
        save_json(&store, "marker", &Marker { count: 3 }).await.unwrap();

        let loaded: Option<Marker> = load_json(&store, "marker").await.unwrap();
        assert_eq!(loaded, Some(Marker { count: 3 }));

        let missing: Option<Marker> = load_json(&store, "other").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_load_json_reports_corruption() {
        let store = MemoryStore::new();
        store.set("marker", "{not json").await.unwrap();

        let result: StoreResult<Option<Marker>> = load_json(&store, "marker").await;
        assert!(matches!(result, Err(crate::StoreError::Serialization(_))));
    }
}
