//! # Token Store
//!
//! In-memory token pair mirrored to durable storage.
//!
//! ## State
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         TokenStore                                      │
//! │                                                                         │
//! │   memory: RwLock<Option<TokenPair>>   ◄── read on every request         │
//! │                    │                                                    │
//! │                    │ store() / clear()                                  │
//! │                    ▼                                                    │
//! │   storage: "mealprep.auth.tokens"     ◄── read once at initialize()     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Memory is updated before storage so concurrent requests see the new pair
//! immediately. A failed storage write is logged; the session continues in
//! memory and the next successful write catches storage up.

use std::sync::{Arc, RwLock};

use mealprep_core::TokenPair;
use mealprep_store::{keys, load_json, save_json, KeyValueStore};
use tracing::{debug, error, info, warn};

/// Access tokens closer than this to expiry are reported at restore.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Holder of the current token pair.
pub struct TokenStore {
    storage: Arc<dyn KeyValueStore>,
    tokens: RwLock<Option<TokenPair>>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        TokenStore {
            storage,
            tokens: RwLock::new(None),
        }
    }

    /// Loads the persisted pair into memory and reports whether a session
    /// exists.
    ///
    /// A malformed persisted value is removed and reported as no session.
    pub async fn initialize(&self) -> bool {
        match load_json::<TokenPair>(self.storage.as_ref(), keys::AUTH_TOKENS).await {
            Ok(Some(pair)) => {
                if pair.is_refresh_expired() {
                    warn!("Persisted refresh token is past its expiry");
                } else if pair.needs_refresh(chrono::Duration::seconds(EXPIRY_MARGIN_SECS)) {
                    debug!("Persisted access token expires soon, first request will refresh");
                }
                let expires_in_secs = pair.remaining_secs();
                self.set_memory(Some(pair));
                info!(?expires_in_secs, "Session restored from storage");
                true
            }
            Ok(None) => {
                self.set_memory(None);
                false
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted tokens");
                if let Err(e) = self.storage.remove(keys::AUTH_TOKENS).await {
                    error!(error = %e, "Failed to remove unreadable tokens");
                }
                self.set_memory(None);
                false
            }
        }
    }

    /// Replaces both tokens, in memory first, then in storage.
    pub async fn store(&self, pair: TokenPair) {
        self.set_memory(Some(pair.clone()));

        if let Err(e) = save_json(self.storage.as_ref(), keys::AUTH_TOKENS, &pair).await {
            error!(error = %e, "Failed to persist tokens");
        }
    }

    /// Removes both tokens from memory and storage.
    pub async fn clear(&self) {
        self.set_memory(None);

        if let Err(e) = self.storage.remove(keys::AUTH_TOKENS).await {
            error!(error = %e, "Failed to remove persisted tokens");
        }
    }

    pub fn current(&self) -> Option<TokenPair> {
        self.read(|tokens| tokens.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(|tokens| tokens.as_ref().map(|t| t.access_token.clone()))
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(|tokens| tokens.as_ref().map(|t| t.refresh_token.clone()))
    }

    pub fn has_session(&self) -> bool {
        self.read(|tokens| tokens.is_some())
    }

    fn read<T>(&self, f: impl FnOnce(&Option<TokenPair>) -> T) -> T {
        match self.tokens.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn set_memory(&self, pair: Option<TokenPair>) {
        match self.tokens.write() {
            Ok(mut guard) => *guard = pair,
            Err(poisoned) => *poisoned.into_inner() = pair,
        }
    }
}
