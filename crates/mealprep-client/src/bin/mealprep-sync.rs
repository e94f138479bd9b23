//! # mealprep-sync
//!
//! One-shot sync: restores the stored session and offline queue, replays
//! queued writes, and prints the resulting sync status as JSON.
//!
//! ```text
//! mealprep-sync [CONFIG_PATH]
//!
//!   RUST_LOG            log filter (default: info,mealprep=debug,sqlx=warn)
//!   MEALPREP_API_URL    overrides api.base_url
//!   MEALPREP_DB_PATH    overrides storage.database_path
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use mealprep_client::{ApiClient, ClientConfig, SyncCoordinator};
use mealprep_store::{KeyValueStore, SqliteStore, StoreConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mealprep=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ClientConfig::load(config_path)?;
    info!(
        base_url = %config.base_url(),
        database = %config.database_path().display(),
        "Configuration loaded"
    );

    let store = SqliteStore::new(StoreConfig::new(config.database_path())).await?;
    let storage: Arc<dyn KeyValueStore> = Arc::new(store.clone());

    let client = ApiClient::builder(config).with_storage(storage.clone()).build()?;
    let has_session = client.initialize().await?;
    if !has_session {
        info!("No stored session, queued writes will be sent unauthenticated");
    }

    let coordinator = SyncCoordinator::new(client, storage);
    coordinator.initialize().await?;

    let report = coordinator.perform_full_sync().await?;
    info!(
        processed = report.drain.processed,
        succeeded = report.drain.succeeded,
        retained = report.drain.retained,
        "Sync finished"
    );

    let status = coordinator.status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);

    store.close().await;
    Ok(())
}
