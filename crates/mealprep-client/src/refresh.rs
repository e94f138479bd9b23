//! # Refresh Coordination
//!
//! At most one token refresh is in flight. Every request that observes an
//! expired access token while it runs parks as a waiter and is released with
//! the refresher's result.
//!
//! ## Roles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Refresh Coordination                                 │
//! │                                                                         │
//! │  request A ──401──► refresh(stale=A's token)                            │
//! │                       │ no session            → SESSION_EXPIRED         │
//! │                       │ token already rotated → current token           │
//! │                       │ refresh running       → park as waiter          │
//! │                       │ otherwise             → become the refresher    │
//! │                       ▼                                                 │
//! │  refresher: POST refresh ──► ok:   store pair, release waiters (token)  │
//! │                          └─► fail: clear tokens, release waiters        │
//! │                                    (SESSION_EXPIRED)                    │
//! │                                                                         │
//! │  request B ──401──► parked ─────────────────► released together         │
//! │  request C ──401──► parked ─────────────────► released together         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The role decision and the waiter list share one lock that is never held
//! across an await. If the refresher is dropped mid-flight its waiters see
//! their channel close and run the decision again.

use std::future::Future;
use std::sync::Mutex;

use mealprep_core::{ApiFailure, TokenPair};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::token_store::TokenStore;

type RefreshResult = Result<String, ApiFailure>;

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    waiters: Vec<oneshot::Sender<RefreshResult>>,
}

enum Role {
    Done(RefreshResult),
    Wait(oneshot::Receiver<RefreshResult>),
    Lead(String),
}

/// Serializes token refreshes.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Ends the refresher role. Dropped without a result (cancellation), it
/// closes every waiter's channel instead of answering it.
struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    result: Option<RefreshResult>,
}

impl LeaderGuard<'_> {
    fn finish(mut self, result: &RefreshResult) {
        self.result = Some(result.clone());
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        let waiters = self.coordinator.take_waiters();
        let Some(result) = self.result.take() else {
            return;
        };
        debug!(waiters = waiters.len(), "Releasing refresh waiters");
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a refresh call is running.
    pub fn is_refreshing(&self) -> bool {
        self.with_state(|state| state.in_progress)
    }

    /// Returns a fresh access token for a request that was rejected while
    /// using `stale`.
    ///
    /// `do_refresh` receives the current refresh token and performs the
    /// refresh call; it is invoked only by the single refresher.
    pub async fn refresh<F, Fut>(
        &self,
        tokens: &TokenStore,
        stale: Option<&str>,
        do_refresh: F,
    ) -> RefreshResult
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<TokenPair, ApiFailure>>,
    {
        let mut do_refresh = Some(do_refresh);

        loop {
            match self.decide(tokens, stale) {
                Role::Done(result) => return result,
                Role::Wait(rx) => match rx.await {
                    Ok(result) => return result,
                    Err(_) => {
                        debug!("Refresher went away, re-evaluating");
                        continue;
                    }
                },
                Role::Lead(refresh_token) => {
                    let Some(call) = do_refresh.take() else {
                        return Err(ApiFailure::session_expired());
                    };
                    let guard = LeaderGuard {
                        coordinator: self,
                        result: None,
                    };

                    let result = match call(refresh_token).await {
                        Ok(pair) => {
                            let access = pair.access_token.clone();
                            tokens.store(pair).await;
                            info!("Access token refreshed");
                            Ok(access)
                        }
                        Err(failure) => {
                            warn!(code = %failure.code, error = %failure.error, "Token refresh failed, clearing session");
                            tokens.clear().await;
                            Err(ApiFailure::session_expired())
                        }
                    };

                    guard.finish(&result);
                    return result;
                }
            }
        }
    }

    fn decide(&self, tokens: &TokenStore, stale: Option<&str>) -> Role {
        self.with_state(|state| {
            let Some(pair) = tokens.current() else {
                return Role::Done(Err(ApiFailure::session_expired()));
            };

            if stale != Some(pair.access_token.as_str()) {
                debug!("Token already rotated, retrying with current token");
                return Role::Done(Ok(pair.access_token));
            }

            if state.in_progress {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Role::Wait(rx)
            } else {
                state.in_progress = true;
                Role::Lead(pair.refresh_token)
            }
        })
    }

    fn take_waiters(&self) -> Vec<oneshot::Sender<RefreshResult>> {
        self.with_state(|state| {
            state.in_progress = false;
            std::mem::take(&mut state.waiters)
        })
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut RefreshState) -> T) -> T {
        match self.state.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealprep_core::ErrorCode;
    use mealprep_store::{keys, KeyValueStore, MemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    async fn session(storage: Arc<MemoryStore>) -> TokenStore {
        let tokens = TokenStore::new(storage);
        tokens.store(TokenPair::new("old-access", "refresh-1")).await;
        tokens
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_call() {
        let tokens = session(Arc::new(MemoryStore::new())).await;
        let coordinator = RefreshCoordinator::new();
        let calls = AtomicUsize::new(0);

        let do_refresh = |refresh_token: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                assert_eq!(refresh_token, "refresh-1");
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(TokenPair::new("new-access", "refresh-2"))
            }
        };

        let (a, b, c) = tokio::join!(
            coordinator.refresh(&tokens, Some("old-access"), do_refresh),
            coordinator.refresh(&tokens, Some("old-access"), do_refresh),
            coordinator.refresh(&tokens, Some("old-access"), do_refresh),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in [a, b, c] {
            assert_eq!(result.unwrap(), "new-access");
        }
        assert_eq!(tokens.refresh_token().as_deref(), Some("refresh-2"));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_failed_refresh_expires_session_for_everyone() {
        let storage = Arc::new(MemoryStore::new());
        let tokens = session(storage.clone()).await;
        let coordinator = RefreshCoordinator::new();

        let do_refresh = |_: String| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(ApiFailure::from_response(401, &serde_json::json!({"code": "INVALID_REFRESH"})))
        };

        let (a, b) = tokio::join!(
            coordinator.refresh(&tokens, Some("old-access"), do_refresh),
            coordinator.refresh(&tokens, Some("old-access"), do_refresh),
        );

        assert_eq!(a.unwrap_err().code, ErrorCode::SessionExpired);
        assert_eq!(b.unwrap_err().code, ErrorCode::SessionExpired);
        assert!(!tokens.has_session());
        assert!(storage.get(keys::AUTH_TOKENS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_token_skips_refresh() {
        let tokens = session(Arc::new(MemoryStore::new())).await;
        let coordinator = RefreshCoordinator::new();

        let result = coordinator
            .refresh(&tokens, Some("older-than-old"), |_: String| async {
                Err::<TokenPair, _>(ApiFailure::network("refresh must not run"))
            })
            .await;

        assert_eq!(result.unwrap(), "old-access");
    }

    #[tokio::test]
    async fn test_no_session() {
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
        let coordinator = RefreshCoordinator::new();

        let result = coordinator
            .refresh(&tokens, None, |_: String| async {
                Ok(TokenPair::new("never", "used"))
            })
            .await;

        assert_eq!(result.unwrap_err().code, ErrorCode::SessionExpired);
    }

    #[tokio::test]
    async fn test_cancelled_refresher_releases_role() {
        let tokens = session(Arc::new(MemoryStore::new())).await;
        let coordinator = RefreshCoordinator::new();

        let cancelled = tokio::time::timeout(
            Duration::from_millis(10),
            coordinator.refresh(&tokens, Some("old-access"), |_: String| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(TokenPair::new("never", "used"))
            }),
        )
        .await;
        assert!(cancelled.is_err());
        assert!(!coordinator.is_refreshing());

        let result = coordinator
            .refresh(&tokens, Some("old-access"), |_: String| async {
                Ok(TokenPair::new("new-access", "refresh-2"))
            })
            .await;
        assert_eq!(result.unwrap(), "new-access");
    }
}
