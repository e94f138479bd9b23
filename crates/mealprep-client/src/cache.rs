//! # Response Cache
//!
//! Fingerprint → JSON payload with a per-entry TTL. Only successful reads are
//! stored; successful writes invalidate by substring.
//!
//! ## Validity
//! ```text
//!   stored_at                 stored_at + ttl
//!       │◄──────── valid ────────►│
//!       ●─────────────────────────●─────────────► time
//!                                  expired: treated as absent,
//!                                  evicted on the next lookup
//! ```
//!
//! Time comes from `tokio::time::Instant` so tests can pause and advance the
//! clock.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_valid(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) <= self.ttl
    }
}

/// In-memory cache of read responses.
#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        ResponseCache {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns a valid entry; an expired one is evicted and reported absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        self.with_entries(|entries| match entries.get(key) {
            Some(entry) if entry.is_valid(now) => Some(entry.data.clone()),
            Some(_) => {
                entries.remove(key);
                debug!(key = %key, "Evicted expired cache entry");
                None
            }
            None => None,
        })
    }

    /// Stores a payload with `ttl`, or the default TTL when None.
    pub fn insert(&self, key: impl Into<String>, data: Value, ttl: Option<Duration>) {
        let entry = CacheEntry {
            data,
            stored_at: Instant::now(),
            ttl: ttl.unwrap_or(self.default_ttl),
        };
        self.with_entries(|entries| {
            entries.insert(key.into(), entry);
        });
    }

    /// Removes every entry whose key contains `pattern`. Returns the count.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let removed = self.with_entries(|entries| {
            let before = entries.len();
            entries.retain(|key, _| !key.contains(pattern));
            before - entries.len()
        });
        if removed > 0 {
            debug!(pattern = %pattern, removed, "Invalidated cache entries");
        }
        removed
    }

    pub fn clear(&self) {
        self.with_entries(|entries| entries.clear());
    }

    /// Number of stored entries, expired ones included until looked up.
    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, CacheEntry>) -> T) -> T {
        match self.entries.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_entry_valid_until_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.insert("GET:/patterns:", json!([1, 2]), Some(Duration::from_millis(500)));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(cache.get("GET:/patterns:"), Some(json!([1, 2])));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("GET:/patterns:"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.insert("k", json!(1), None);

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get("k").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_invalidate_by_substring() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("GET:/meals/1:", json!({}), None);
        cache.insert("GET:/meals/1?expand=photo:", json!({}), None);
        cache.insert("GET:/meals/2:", json!({}), None);
        cache.insert("GET:/patterns:", json!({}), None);

        assert_eq!(cache.invalidate("/meals/1"), 2);
        assert!(cache.get("GET:/meals/2:").is_some());
        assert!(cache.get("GET:/patterns:").is_some());
        assert_eq!(cache.invalidate("/inventory"), 0);
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("a", json!(1), None);
        cache.insert("b", json!(2), None);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
