//! # In-Flight Registry
//!
//! Coalesces concurrent identical reads into one network call.
//!
//! ## Lifecycle of an Entry
//! ```text
//!   caller A ── get_or_register(key, fut) ──► registered, A awaits
//!   caller B ── get(key) ───────────────────► same Shared future, B awaits
//!   caller C ── get(key) ───────────────────► same Shared future, C awaits
//!                          │
//!                    future settles (success or failure)
//!                          │
//!                    remove(key)  ──► next read starts a new call
//! ```
//!
//! The registered future removes its own entry when it settles, so the entry
//! never outlives the result even if the first caller is dropped.

use std::collections::HashMap;
use std::sync::Mutex;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use mealprep_core::ApiOutcome;
use serde_json::Value;

/// A pending read shared by every caller with the same fingerprint.
pub type SharedRequest = Shared<BoxFuture<'static, ApiOutcome<Value>>>;

/// Fingerprint → pending read.
#[derive(Default)]
pub struct InFlightRegistry {
    pending: Mutex<HashMap<String, SharedRequest>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pending read for `key`, if any.
    pub fn get(&self, key: &str) -> Option<SharedRequest> {
        self.with_pending(|pending| pending.get(key).cloned())
    }

    /// Returns the pending read for `key`, registering `make()` if there is
    /// none. Check and insert happen under one lock, so two callers can never
    /// both register.
    pub fn get_or_register(
        &self,
        key: &str,
        make: impl FnOnce() -> BoxFuture<'static, ApiOutcome<Value>>,
    ) -> SharedRequest {
        self.with_pending(|pending| {
            pending
                .entry(key.to_string())
                .or_insert_with(|| make().shared())
                .clone()
        })
    }

    pub fn remove(&self, key: &str) {
        self.with_pending(|pending| {
            pending.remove(key);
        });
    }

    pub fn len(&self) -> usize {
        self.with_pending(|pending| pending.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_pending<T>(&self, f: impl FnOnce(&mut HashMap<String, SharedRequest>) -> T) -> T {
        match self.pending.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_second_registration_reuses_first() {
        let registry = InFlightRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |calls: Arc<AtomicUsize>| {
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { ApiOutcome::success(json!("payload")) }.boxed()
            }
        };

        let first = registry.get_or_register("GET:/patterns:", make(calls.clone()));
        let second = registry.get_or_register("GET:/patterns:", make(calls.clone()));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(first.await, second.await);
    }

    #[tokio::test]
    async fn test_remove_allows_new_registration() {
        let registry = InFlightRegistry::new();
        let _ = registry.get_or_register("k", || async { ApiOutcome::success(json!(1)) }.boxed());
        assert!(registry.get("k").is_some());

        registry.remove("k");
        assert!(registry.get("k").is_none());
        assert!(registry.is_empty());
    }
}
