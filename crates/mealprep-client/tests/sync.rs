//! Offline queue replay and sync coordination against a mock HTTP server.

use std::sync::Arc;
use std::time::Duration;

use mealprep_client::{ApiClient, ClientConfig, ClientError, SyncCoordinator};
use mealprep_core::{NetworkState, RequestOptions};
use mealprep_store::{keys, KeyValueStore, MemoryStore, SqliteStore, StoreConfig};
use serde_json::json;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.base_url = server.uri();
    config.retry.max_retries = 0;
    config.sync.max_queue_retries = 2;
    config
}

fn setup(server: &MockServer, storage: Arc<dyn KeyValueStore>) -> SyncCoordinator {
    let client = ApiClient::builder(config_for(server))
        .with_storage(storage.clone())
        .build()
        .unwrap();
    SyncCoordinator::new(client, storage)
}

async fn queue(coordinator: &SyncCoordinator, endpoint: &str, options: RequestOptions) {
    let outcome = coordinator.client().request_value(endpoint, options).await;
    assert!(outcome.is_queued(), "expected queued, got {outcome:?}");
}

#[tokio::test]
async fn test_reconnect_replays_in_fifo_order() {
    let server = MockServer::start().await;
    Mock::given(path("/meals"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "m1"})))
        .mount(&server)
        .await;
    Mock::given(path("/meals/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "m1"})))
        .mount(&server)
        .await;
    Mock::given(path("/inventory/i1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let coordinator = setup(&server, Arc::new(MemoryStore::new()));
    coordinator.handle_network_change(NetworkState::offline()).await;

    queue(&coordinator, "/meals", RequestOptions::post(json!({"name": "Chili"}))).await;
    queue(&coordinator, "/meals/m1", RequestOptions::put(json!({"name": "Chili v2"}))).await;
    queue(&coordinator, "/inventory/i1", RequestOptions::delete()).await;
    assert_eq!(coordinator.status().await.pending_count, 3);

    let report = coordinator
        .handle_network_change(NetworkState::online())
        .await
        .unwrap();
    assert_eq!(report.succeeded, 3);

    let order: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| format!("{} {}", r.method.as_str(), r.url.path()))
        .collect();
    assert_eq!(order, vec!["POST /meals", "PUT /meals/m1", "DELETE /inventory/i1"]);
    assert_eq!(coordinator.status().await.pending_count, 0);
}

#[tokio::test]
async fn test_failing_item_is_retained_then_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pattern-logs"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let coordinator = setup(&server, Arc::new(MemoryStore::new()));
    coordinator.client().set_online(false);
    queue(&coordinator, "/pattern-logs", RequestOptions::post(json!({"rating": 3}))).await;
    coordinator.client().set_online(true);

    let first = coordinator.try_drain().await;
    assert_eq!((first.failed, first.retained), (0, 1));

    let snapshot = coordinator.client().queue().snapshot().await;
    assert_eq!(snapshot[0].retry_count, 1);
    assert!(snapshot[0].last_error.as_deref().unwrap().contains("HTTP_500"));
    assert!(coordinator.status().await.last_error.is_some());

    let second = coordinator.try_drain().await;
    assert_eq!((second.failed, second.retained), (1, 0));
    assert!(coordinator.client().queue().is_empty().await);
}

#[tokio::test]
async fn test_queue_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/meals"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "m1"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = SqliteStore::new(StoreConfig::in_memory()).await.unwrap();
    let storage: Arc<dyn KeyValueStore> = Arc::new(store);

    {
        let before = setup(&server, storage.clone());
        before.client().set_online(false);
        queue(&before, "/meals", RequestOptions::post(json!({"name": "Chili"}))).await;
    }

    assert!(storage.get(keys::OFFLINE_QUEUE).await.unwrap().is_some());

    let after = setup(&server, storage);
    after.client().initialize().await.unwrap();
    assert_eq!(after.status().await.pending_count, 1);

    let report = after.perform_full_sync().await.unwrap();
    assert_eq!(report.drain.succeeded, 1);
}

#[tokio::test]
async fn test_full_sync_requires_connectivity() {
    let server = MockServer::start().await;
    let coordinator = setup(&server, Arc::new(MemoryStore::new()));
    coordinator.handle_network_change(NetworkState::offline()).await;

    let result = coordinator.perform_full_sync().await;
    assert!(matches!(result, Err(ClientError::Offline)));

    let status = coordinator.status().await;
    assert!(!status.is_online);
    assert!(!status.is_syncing);
    assert!(status.last_sync_at.is_none());
}

#[tokio::test]
async fn test_full_sync_refreshes_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patterns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let coordinator = setup(&server, storage.clone());
    let client = coordinator.client().clone();

    client.request_value("/patterns", RequestOptions::get()).await;
    assert!(client.request_value("/patterns", RequestOptions::get()).await.is_from_cache());

    coordinator.perform_full_sync().await.unwrap();
    assert!(!client.request_value("/patterns", RequestOptions::get()).await.is_from_cache());
    assert!(storage.get(keys::LAST_SYNC_AT).await.unwrap().is_some());
}

#[tokio::test]
async fn test_background_loop_drains_on_interval() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/meals"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/meals"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "m1"})))
        .mount(&server)
        .await;

    let coordinator = setup(&server, Arc::new(MemoryStore::new()));
    let coordinator = Arc::new(coordinator.with_interval(Duration::from_millis(50)));
    coordinator.client().set_online(false);
    queue(&coordinator, "/meals", RequestOptions::post(json!({"name": "Chili"}))).await;

    let (_network_tx, network_rx) = watch::channel(NetworkState::online());
    let handle = coordinator.clone().spawn(network_rx);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !coordinator.client().queue().is_empty().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("queue drained by the periodic loop");

    handle.shutdown().await;
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
