//! # Sync Coordinator
//!
//! Decides when the offline queue is replayed.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Coordinator                                 │
//! │                                                                         │
//! │   flags: online (owned by ApiClient), syncing                           │
//! │                                                                         │
//! │   NetworkState ──► handle_network_change                                │
//! │                      offline ──► online  (rising edge) ──► try_drain    │
//! │                                                                         │
//! │   interval tick ─────────────────────────────────────────► try_drain    │
//! │                                                                         │
//! │   try_drain:          offline or syncing ──► skipped                    │
//! │                       else syncing=true, drain, syncing=false           │
//! │                                                                         │
//! │   perform_full_sync:  offline ──► Err(Offline)                          │
//! │                       syncing ──► Err(SyncInProgress)                   │
//! │                       drain ──► clear cache (pull) ──► last_sync_at     │
//! │                       syncing reset on every exit path                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The interval and the online edge may both fire; the `syncing` flag turns
//! the second attempt into a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mealprep_core::{DrainReport, NetworkState};
use mealprep_store::{keys, load_json, save_json, KeyValueStore, StoreError};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use ts_rs::TS;

use crate::error::{ClientError, ClientResult};
use crate::pipeline::ApiClient;

/// Default interval between periodic drain attempts.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

// =============================================================================
// Sync Status
// =============================================================================

/// Snapshot of sync state for the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SyncStatus {
    pub is_online: bool,
    pub is_syncing: bool,

    /// Writes waiting in the offline queue.
    pub pending_count: u32,

    /// Completion time of the last full sync.
    #[ts(as = "Option<String>")]
    pub last_sync_at: Option<DateTime<Utc>>,

    pub last_error: Option<String>,
}

/// Result of a completed full sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub drain: DrainReport,
    pub completed_at: DateTime<Utc>,
}

// =============================================================================
// Sync Events
// =============================================================================

/// Receives sync notifications (bridged to the UI by the host app).
pub trait SyncEventEmitter: Send + Sync {
    /// Emits a sync status change event.
    fn emit_status(&self, status: &SyncStatus);

    /// Emits the outcome of a queue drain.
    fn emit_progress(&self, report: &DrainReport);

    /// Emits a sync error event.
    fn emit_error(&self, message: &str, retryable: bool);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &SyncStatus) {}
    fn emit_progress(&self, _report: &DrainReport) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}

// =============================================================================
// Sync Coordinator
// =============================================================================

pub struct SyncCoordinator {
    client: ApiClient,
    storage: Arc<dyn KeyValueStore>,
    emitter: Arc<dyn SyncEventEmitter>,
    interval: Duration,
    syncing: AtomicBool,
    last_sync: Mutex<Option<DateTime<Utc>>>,
    last_error: Mutex<Option<String>>,
}

/// Holds the `syncing` flag; released on drop so every exit path resets it.
struct SyncingGuard<'a>(&'a AtomicBool);

impl<'a> SyncingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SyncingGuard(flag))
    }
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncCoordinator {
    /// `storage` must be the store the client persists its queue to. The
    /// drain interval comes from the client's `[sync]` settings.
    pub fn new(client: ApiClient, storage: Arc<dyn KeyValueStore>) -> Self {
        SyncCoordinator {
            interval: client.sync_interval(),
            client,
            storage,
            emitter: Arc::new(NoOpEmitter),
            syncing: AtomicBool::new(false),
            last_sync: Mutex::new(None),
            last_error: Mutex::new(None),
        }
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn SyncEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Restores the persisted last-sync timestamp.
    pub async fn initialize(&self) -> ClientResult<()> {
        match load_json::<DateTime<Utc>>(self.storage.as_ref(), keys::LAST_SYNC_AT).await {
            Ok(restored) => {
                if let Some(at) = restored {
                    debug!(last_sync_at = %at, "Restored last sync time");
                }
                set(&self.last_sync, restored);
                Ok(())
            }
            Err(StoreError::Serialization(e)) => {
                warn!(error = %e, "Ignoring unreadable last sync time");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Triggers
    // =========================================================================

    /// Applies a connectivity event. A transition to online drains the queue
    /// and returns the drain report.
    pub async fn handle_network_change(&self, state: NetworkState) -> Option<DrainReport> {
        let online = state.is_online();
        let was_online = self.client.set_online(online);

        if online == was_online {
            return None;
        }

        self.emit_status().await;

        if online {
            info!("Back online, replaying offline queue");
            Some(self.try_drain().await)
        } else {
            info!("Offline, writes will be queued");
            None
        }
    }

    /// Drains the queue unless offline or a sync is already running.
    pub async fn try_drain(&self) -> DrainReport {
        if !self.client.is_online() {
            debug!("Offline, skipping drain");
            return DrainReport::skipped();
        }

        let Some(guard) = SyncingGuard::acquire(&self.syncing) else {
            debug!("Sync already running, skipping drain");
            return DrainReport::skipped();
        };

        let report = self.client.drain_offline_queue().await;
        self.record_drain(&report);
        drop(guard);

        self.emit_status().await;
        report
    }

    /// Drains the queue, refreshes server state and records the sync time.
    pub async fn perform_full_sync(&self) -> ClientResult<SyncReport> {
        if !self.client.is_online() {
            return Err(ClientError::Offline);
        }

        let guard = SyncingGuard::acquire(&self.syncing).ok_or(ClientError::SyncInProgress)?;
        info!("Starting full sync");
        self.emit_status().await;

        let result = self.run_full_sync().await;
        drop(guard);

        match &result {
            Ok(report) => {
                info!(
                    succeeded = report.drain.succeeded,
                    retained = report.drain.retained,
                    "Full sync complete"
                );
            }
            Err(e) => {
                error!(error = %e, "Full sync failed");
                set(&self.last_error, Some(e.to_string()));
                self.emitter.emit_error(&e.to_string(), e.is_retryable());
            }
        }

        self.emit_status().await;
        result
    }

    async fn run_full_sync(&self) -> ClientResult<SyncReport> {
        let drain = self.client.drain_offline_queue().await;
        self.record_drain(&drain);

        // Pull: cached reads are dropped so the next read hits the server.
        self.client.clear_cache();

        let completed_at = Utc::now();
        save_json(self.storage.as_ref(), keys::LAST_SYNC_AT, &completed_at).await?;
        set(&self.last_sync, Some(completed_at));

        Ok(SyncReport {
            drain,
            completed_at,
        })
    }

    fn record_drain(&self, report: &DrainReport) {
        if report.skipped {
            return;
        }

        self.emitter.emit_progress(report);

        if report.failed > 0 || report.retained > 0 {
            let message = format!(
                "{} queued writes dropped, {} kept for retry",
                report.failed, report.retained
            );
            warn!(failed = report.failed, retained = report.retained, "Queue drain incomplete");
            self.emitter.emit_error(&message, report.retained > 0);
            set(&self.last_error, Some(message));
        } else if report.processed > 0 {
            set(&self.last_error, None);
        }
    }

    // =========================================================================
    // Status
    // =========================================================================

    pub async fn status(&self) -> SyncStatus {
        let pending = self.client.queue().len().await;
        SyncStatus {
            is_online: self.client.is_online(),
            is_syncing: self.syncing.load(Ordering::SeqCst),
            pending_count: u32::try_from(pending).unwrap_or(u32::MAX),
            last_sync_at: get(&self.last_sync),
            last_error: get(&self.last_error),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    async fn emit_status(&self) {
        let status = self.status().await;
        self.emitter.emit_status(&status);
    }

    // =========================================================================
    // Background Loop
    // =========================================================================

    /// Runs the coordinator until [`SyncHandle::shutdown`] is called or the
    /// handle is dropped.
    ///
    /// The current value of `network` is applied first; afterwards every
    /// change and every interval tick is handled in turn.
    pub fn spawn(self: Arc<Self>, mut network: watch::Receiver<NetworkState>) -> SyncHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            let initial = *network.borrow_and_update();
            self.handle_network_change(initial).await;

            let mut observing = true;
            info!(interval_secs = self.interval.as_secs(), "Sync loop started");

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                    changed = network.changed(), if observing => {
                        if changed.is_err() {
                            debug!("Connectivity observer closed");
                            observing = false;
                            continue;
                        }
                        let state = *network.borrow_and_update();
                        self.handle_network_change(state).await;
                    }
                    _ = ticker.tick() => {
                        self.try_drain().await;
                    }
                }
            }

            info!("Sync loop stopped");
        });

        SyncHandle { shutdown_tx, task }
    }
}

/// Handle to a spawned sync loop.
pub struct SyncHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Stops the loop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Sync loop ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

fn get<T: Clone>(slot: &Mutex<T>) -> T {
    match slot.lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn set<T>(slot: &Mutex<T>, value: T) {
    match slot.lock() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}
