//! # Client Configuration
//!
//! Configuration management for the network layer.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     MEALPREP_API_URL=https://api.mealprep.app/api                       │
//! │     MEALPREP_REQUEST_TIMEOUT_MS=15000                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/app/client.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.mealprep.app/client.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     http://localhost:8000/api, 30s timeout, 3 retries, 5 min TTL        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # client.toml
//! [api]
//! base_url = "https://api.mealprep.app/api"
//! request_timeout_ms = 30000
//!
//! [retry]
//! max_retries = 3
//! base_delay_ms = 1000
//! max_delay_ms = 30000
//!
//! [cache]
//! default_ttl_secs = 300
//!
//! [sync]
//! interval_secs = 30
//! max_queue_retries = 3
//! ```

use std::path::PathBuf;
use std::time::Duration;

use mealprep_core::RetryPolicy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

// =============================================================================
// API Settings
// =============================================================================

/// Where and how to reach the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every endpoint is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-attempt request timeout (milliseconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Token refresh endpoint, relative to `base_url`.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_refresh_path() -> String {
    "/auth/refresh".to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout(),
            refresh_path: default_refresh_path(),
        }
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

/// Backoff for retryable request failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first resubmission (milliseconds).
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Cap on any single delay (milliseconds).
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    mealprep_core::retry::DEFAULT_MAX_RETRIES
}

fn default_base_delay() -> u64 {
    mealprep_core::retry::DEFAULT_BASE_DELAY_MS
}

fn default_max_delay() -> u64 {
    mealprep_core::retry::DEFAULT_MAX_DELAY_MS
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

// =============================================================================
// Cache Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// TTL of cached reads without a per-request override (seconds).
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    300
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            default_ttl_secs: default_cache_ttl(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Interval between periodic drain attempts (seconds).
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,

    /// Failed replays after which a queued write is dropped.
    #[serde(default = "default_max_queue_retries")]
    pub max_queue_retries: u32,
}

fn default_sync_interval() -> u64 {
    crate::sync::DEFAULT_SYNC_INTERVAL.as_secs()
}

fn default_max_queue_retries() -> u32 {
    crate::offline_queue::DEFAULT_MAX_QUEUE_RETRIES
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            interval_secs: default_sync_interval(),
            max_queue_retries: default_max_queue_retries(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file; defaults to `mealprep.db` in the platform data dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (client.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ClientResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ClientError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClientError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ClientError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Client config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        let url = url::Url::parse(&self.api.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.request_timeout_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "request_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ClientError::InvalidConfig(
                "max_delay_ms must not be less than base_delay_ms".into(),
            ));
        }

        if self.sync.max_queue_retries == 0 {
            return Err(ClientError::InvalidConfig(
                "max_queue_retries must be greater than 0".into(),
            ));
        }

        if self.sync.interval_secs == 0 {
            return Err(ClientError::InvalidConfig(
                "interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any variable source.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("MEALPREP_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(timeout) = lookup("MEALPREP_REQUEST_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) => self.api.request_timeout_ms = ms,
                Err(_) => warn!(value = %timeout, "Ignoring invalid MEALPREP_REQUEST_TIMEOUT_MS"),
            }
        }

        if let Some(retries) = lookup("MEALPREP_MAX_RETRIES") {
            match retries.parse::<u32>() {
                Ok(n) => self.retry.max_retries = n,
                Err(_) => warn!(value = %retries, "Ignoring invalid MEALPREP_MAX_RETRIES"),
            }
        }

        if let Some(ttl) = lookup("MEALPREP_CACHE_TTL_SECS") {
            match ttl.parse::<u64>() {
                Ok(secs) => self.cache.default_ttl_secs = secs,
                Err(_) => warn!(value = %ttl, "Ignoring invalid MEALPREP_CACHE_TTL_SECS"),
            }
        }

        if let Some(interval) = lookup("MEALPREP_SYNC_INTERVAL_SECS") {
            match interval.parse::<u64>() {
                Ok(secs) => self.sync.interval_secs = secs,
                Err(_) => warn!(value = %interval, "Ignoring invalid MEALPREP_SYNC_INTERVAL_SECS"),
            }
        }

        if let Some(path) = lookup("MEALPREP_DB_PATH") {
            self.storage.database_path = Some(PathBuf::from(path));
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "mealprep", "app")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("client.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn base_url(&self) -> &str {
        &self.api.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.base_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
        )
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.default_ttl_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs)
    }

    /// SQLite file path: configured, else the platform data dir, else the
    /// working directory.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join("mealprep.db")))
            .unwrap_or_else(|| PathBuf::from("mealprep.db"))
    }
}
