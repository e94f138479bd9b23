//! # Offline Queue
//!
//! Persisted FIFO of writes attempted while offline.
//!
//! ## Drain Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Offline Queue Drain                                  │
//! │                                                                         │
//! │  "mealprep.offline.queue" = [ item1, item2, item3 ]   (FIFO)            │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │  drain(replay): one item at a time, in insertion order                  │
//! │                                                                         │
//! │    replay(item) ──► Ok        remove item, persist                      │
//! │                 └─► Err(e)    retry_count += 1                          │
//! │                               ├── retry_count < max  keep, persist      │
//! │                               └── retry_count >= max drop, persist,     │
//! │                                                      count as failed    │
//! │                                                                         │
//! │  A second drain while one is running returns a skipped report.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lock is never held across `replay`, so new writes can be enqueued
//! while a drain runs; they are replayed by the next pass.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mealprep_core::{DrainReport, QueuedRequest};
use mealprep_store::{keys, load_json, save_json, KeyValueStore, StoreError, StoreResult};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Default number of failed replays before an item is dropped.
pub const DEFAULT_MAX_QUEUE_RETRIES: u32 = 3;

/// Persisted queue of pending writes.
pub struct OfflineQueue {
    storage: Arc<dyn KeyValueStore>,
    items: Mutex<VecDeque<QueuedRequest>>,
    max_retries: u32,
    draining: AtomicBool,
}

/// Resets the draining flag however the drain ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl OfflineQueue {
    pub fn new(storage: Arc<dyn KeyValueStore>, max_retries: u32) -> Self {
        OfflineQueue {
            storage,
            items: Mutex::new(VecDeque::new()),
            max_retries,
            draining: AtomicBool::new(false),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Replaces the in-memory queue with the persisted one. Returns the
    /// number of items loaded.
    ///
    /// An unreadable persisted queue is discarded.
    pub async fn load(&self) -> StoreResult<usize> {
        let loaded = match load_json::<Vec<QueuedRequest>>(self.storage.as_ref(), keys::OFFLINE_QUEUE)
            .await
        {
            Ok(items) => items.unwrap_or_default(),
            Err(StoreError::Serialization(e)) => {
                warn!(error = %e, "Discarding unreadable offline queue");
                self.storage.remove(keys::OFFLINE_QUEUE).await?;
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let count = loaded.len();
        *self.items.lock().await = loaded.into();

        if count > 0 {
            info!(queue_len = count, "Offline queue restored");
        }
        Ok(count)
    }

    /// Appends an item and persists the queue.
    ///
    /// If persisting fails the append is rolled back, so memory never holds
    /// an item storage does not.
    pub async fn enqueue(&self, item: QueuedRequest) -> StoreResult<()> {
        let mut items = self.items.lock().await;
        let id = item.id.clone();
        items.push_back(item);

        if let Err(e) = self.persist(&items).await {
            items.pop_back();
            error!(error = %e, id = %id, "Failed to persist offline queue, write not queued");
            return Err(e);
        }

        debug!(id = %id, queue_len = items.len(), "Write queued for replay");
        Ok(())
    }

    /// Replays every queued item in FIFO order, one at a time.
    pub async fn drain<F, Fut>(&self, mut replay: F) -> DrainReport
    where
        F: FnMut(QueuedRequest) -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Drain already in progress, skipping");
            return DrainReport::skipped();
        }
        let _guard = DrainGuard(&self.draining);

        let snapshot: Vec<QueuedRequest> = self.items.lock().await.iter().cloned().collect();
        let mut report = DrainReport::default();

        if snapshot.is_empty() {
            return report;
        }

        info!(queue_len = snapshot.len(), "Draining offline queue");

        for item in snapshot {
            report.processed += 1;
            let id = item.id.clone();
            let endpoint = item.endpoint.clone();

            let result = replay(item).await;

            let mut items = self.items.lock().await;
            let Some(pos) = items.iter().position(|i| i.id == id) else {
                continue;
            };

            match result {
                Ok(()) => {
                    items.remove(pos);
                    report.succeeded += 1;
                    debug!(id = %id, endpoint = %endpoint, "Queued write replayed");
                }
                Err(e) => {
                    let retry_count = {
                        let entry = &mut items[pos];
                        entry.retry_count += 1;
                        entry.last_error = Some(e.clone());
                        entry.retry_count
                    };

                    if retry_count >= self.max_retries {
                        items.remove(pos);
                        report.failed += 1;
                        warn!(
                            id = %id,
                            endpoint = %endpoint,
                            retry_count,
                            error = %e,
                            "Dropping queued write after max retries"
                        );
                    } else {
                        report.retained += 1;
                        debug!(id = %id, retry_count, error = %e, "Queued write failed, kept");
                    }
                }
            }

            if let Err(e) = self.persist(&items).await {
                error!(error = %e, "Failed to persist offline queue during drain");
            }
        }

        info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            retained = report.retained,
            "Offline queue drain complete"
        );
        report
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Copy of the queue in FIFO order.
    pub async fn snapshot(&self) -> Vec<QueuedRequest> {
        self.items.lock().await.iter().cloned().collect()
    }

    /// Drops every queued item, in memory and in storage.
    pub async fn clear(&self) -> StoreResult<()> {
        let mut items = self.items.lock().await;
        items.clear();
        self.storage.remove(keys::OFFLINE_QUEUE).await
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    async fn persist(&self, items: &VecDeque<QueuedRequest>) -> StoreResult<()> {
        save_json(self.storage.as_ref(), keys::OFFLINE_QUEUE, items).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mealprep_core::RequestOptions;
    use mealprep_store::MemoryStore;
    use serde_json::json;

    fn write(endpoint: &str) -> QueuedRequest {
        QueuedRequest::new(endpoint, RequestOptions::post(json!({"at": endpoint})))
    }

    /// Storage whose writes always fail.
    struct ReadOnlyStore;

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::QueryFailed("disk full".into()))
        }

        async fn remove(&self, _key: &str) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_enqueue_persists() {
        let storage = Arc::new(MemoryStore::new());
        let queue = OfflineQueue::new(storage.clone(), 3);
        queue.enqueue(write("/meals")).await.unwrap();

        let restored = OfflineQueue::new(storage, 3);
        assert_eq!(restored.load().await.unwrap(), 1);
        assert_eq!(restored.snapshot().await[0].endpoint, "/meals");
    }

    #[tokio::test]
    async fn test_enqueue_rolls_back_on_persist_failure() {
        let queue = OfflineQueue::new(Arc::new(ReadOnlyStore), 3);
        assert!(queue.enqueue(write("/meals")).await.is_err());
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_drain_replays_in_fifo_order() {
        let storage = Arc::new(MemoryStore::new());
        let queue = OfflineQueue::new(storage.clone(), 3);
        for endpoint in ["/a", "/b", "/c"] {
            queue.enqueue(write(endpoint)).await.unwrap();
        }

        let mut seen = Vec::new();
        let report = queue
            .drain(|item| {
                seen.push(item.endpoint.clone());
                async { Ok(()) }
            })
            .await;

        assert_eq!(seen, vec!["/a", "/b", "/c"]);
        assert_eq!(report.succeeded, 3);
        assert!(queue.is_empty().await);

        let persisted: Vec<QueuedRequest> = load_json(storage.as_ref(), keys::OFFLINE_QUEUE)
            .await
            .unwrap()
            .unwrap();
        assert!(persisted.is_empty());
    }

    #[tokio::test]
    async fn test_failed_item_kept_until_max_retries() {
        let queue = OfflineQueue::new(Arc::new(MemoryStore::new()), 3);
        queue.enqueue(write("/meals")).await.unwrap();

        for pass in 1..=2 {
            let report = queue.drain(|_| async { Err("HTTP_500".to_string()) }).await;
            assert_eq!(report.retained, 1);
            assert_eq!(report.failed, 0);

            let items = queue.snapshot().await;
            assert_eq!(items[0].retry_count, pass);
            assert_eq!(items[0].last_error.as_deref(), Some("HTTP_500"));
        }

        let report = queue.drain(|_| async { Err("HTTP_500".to_string()) }).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.retained, 0);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_mixed_results() {
        let queue = OfflineQueue::new(Arc::new(MemoryStore::new()), 3);
        queue.enqueue(write("/ok")).await.unwrap();
        queue.enqueue(write("/fail")).await.unwrap();

        let report = queue
            .drain(|item| async move {
                if item.endpoint == "/ok" {
                    Ok(())
                } else {
                    Err("boom".to_string())
                }
            })
            .await;

        assert_eq!(report.processed, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.retained, 1);
        assert_eq!(queue.snapshot().await[0].endpoint, "/fail");
    }

    #[tokio::test]
    async fn test_concurrent_drain_is_skipped() {
        let queue = Arc::new(OfflineQueue::new(Arc::new(MemoryStore::new()), 3));
        queue.enqueue(write("/slow")).await.unwrap();

        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let mut started_tx = Some(started_tx);
        let mut release_rx = Some(release_rx);

        let first = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .drain(|_| {
                        let started = started_tx.take();
                        let release = release_rx.take();
                        async move {
                            if let Some(tx) = started {
                                let _ = tx.send(());
                            }
                            if let Some(rx) = release {
                                let _ = rx.await;
                            }
                            Ok(())
                        }
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        assert!(queue.is_draining());

        let second = queue.drain(|_| async { Ok(()) }).await;
        assert!(second.skipped);

        release_tx.send(()).unwrap();
        let first = first.await.unwrap();
        assert_eq!(first.succeeded, 1);
        assert!(!queue.is_draining());
    }

    #[tokio::test]
    async fn test_unreadable_queue_is_discarded() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::OFFLINE_QUEUE, "[{oops").await.unwrap();

        let queue = OfflineQueue::new(storage.clone(), 3);
        assert_eq!(queue.load().await.unwrap(), 0);
        assert!(storage.get(keys::OFFLINE_QUEUE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let storage = Arc::new(MemoryStore::new());
        let queue = OfflineQueue::new(storage.clone(), 3);
        queue.enqueue(write("/a")).await.unwrap();

        queue.clear().await.unwrap();
        assert_eq!(queue.len().await, 0);
        assert!(storage.get(keys::OFFLINE_QUEUE).await.unwrap().is_none());
    }
}
