//! # Request Pipeline
//!
//! [`ApiClient`] is the single entry point every domain API goes through.
//! It owns the token store, response cache, in-flight registry, offline
//! queue and refresh coordinator, and is cheap to clone.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       request(endpoint, options)                        │
//! │                                                                         │
//! │  1. key = fingerprint(method, endpoint, body) or options.cache_key      │
//! │                                                                         │
//! │  READ                                   WRITE                           │
//! │  2. in flight for key? ──► share it     4. offline? ──► enqueue,        │
//! │  3. cached for key?    ──► fromCache       return Queued                │
//! │     else register shared execution                                      │
//! │                    │                              │                     │
//! │                    └──────────────┬───────────────┘                     │
//! │                                   ▼                                     │
//! │  execute:                                                               │
//! │  5. Authorization: Bearer <access>  (unless skip_auth)                  │
//! │  6. send under timeout ── timeout / network ──► backoff, resubmit       │
//! │  7. 401 TOKEN_EXPIRED ──► single shared refresh, retry once             │
//! │                      └──► refresh failed: SESSION_EXPIRED               │
//! │  8. 408 / 429 / 5xx ──► backoff, resubmit while retries remain          │
//! │  9. 2xx: reads cached with TTL, writes invalidate resource path         │
//! │ 10. anything else ──► Failed(ApiFailure)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing escapes as a panic or `Err`: every path resolves to an
//! [`ApiOutcome`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures_util::future::FutureExt;
use mealprep_core::{
    fingerprint, resource_path, ApiFailure, ApiOutcome, DrainReport, HttpMethod, QueuedRequest,
    RequestBody, RequestOptions, RetryPolicy, TokenPair,
};
use mealprep_store::{KeyValueStore, MemoryStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::{AuthApi, InventoryApi, MealsApi, PatternsApi, PrepApi};
use crate::cache::ResponseCache;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::inflight::InFlightRegistry;
use crate::offline_queue::OfflineQueue;
use crate::refresh::RefreshCoordinator;
use crate::token_store::TokenStore;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};

// =============================================================================
// Client
// =============================================================================

struct ClientInner {
    base_url: String,
    refresh_path: String,
    transport: Arc<dyn HttpTransport>,
    tokens: TokenStore,
    cache: ResponseCache,
    in_flight: InFlightRegistry,
    queue: OfflineQueue,
    refresh: RefreshCoordinator,
    retry: RetryPolicy,
    request_timeout: Duration,
    sync_interval: Duration,
    online: AtomicBool,
}

/// Shared handle to the request pipeline.
///
/// ## Example
/// ```rust,ignore
/// let client = ApiClient::builder(ClientConfig::load(None)?)
///     .with_storage(Arc::new(store))
///     .build()?;
/// client.initialize().await?;
///
/// let patterns = client.patterns().list().await;
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    config: ClientConfig,
    storage: Option<Arc<dyn KeyValueStore>>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl ApiClientBuilder {
    /// Durable storage for tokens and the offline queue (default: in memory).
    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// HTTP transport (default: reqwest).
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> ClientResult<ApiClient> {
        self.config.validate()?;

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>);
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()) as Arc<dyn HttpTransport>);

        let inner = ClientInner {
            base_url: self.config.base_url().trim_end_matches('/').to_string(),
            refresh_path: self.config.api.refresh_path.clone(),
            transport,
            tokens: TokenStore::new(storage.clone()),
            cache: ResponseCache::new(self.config.cache_ttl()),
            in_flight: InFlightRegistry::new(),
            queue: OfflineQueue::new(storage, self.config.sync.max_queue_retries),
            refresh: RefreshCoordinator::new(),
            retry: self.config.retry_policy(),
            request_timeout: self.config.request_timeout(),
            sync_interval: self.config.sync_interval(),
            online: AtomicBool::new(true),
        };

        Ok(ApiClient {
            inner: Arc::new(inner),
        })
    }
}

impl ApiClient {
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            storage: None,
            transport: None,
        }
    }

    /// Restores the persisted session and offline queue. Returns true if a
    /// session exists.
    pub async fn initialize(&self) -> ClientResult<bool> {
        let has_session = self.inner.tokens.initialize().await;
        let queued = self.inner.queue.load().await?;
        info!(has_session, queued, "API client initialized");
        Ok(has_session)
    }

    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Issues a request and decodes a successful body into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ApiOutcome<T> {
        self.request_value(endpoint, options).await.decode()
    }

    /// Issues a request, returning the raw JSON body.
    pub async fn request_value(&self, endpoint: &str, options: RequestOptions) -> ApiOutcome<Value> {
        let key = fingerprint(endpoint, &options);
        debug!(method = %options.method, endpoint = %endpoint, "API request");

        if options.method.is_read() {
            if let Some(pending) = self.inner.in_flight.get(&key) {
                debug!(key = %key, "Joining in-flight request");
                return pending.await;
            }

            if !options.skip_cache {
                if let Some(data) = self.inner.cache.get(&key) {
                    debug!(key = %key, "Cache hit");
                    return ApiOutcome::cached(data);
                }
            }

            let client = self.clone();
            let endpoint = endpoint.to_string();
            let registered_key = key.clone();
            let shared = self.inner.in_flight.get_or_register(&key, move || {
                async move {
                    let outcome = ApiOutcome::from(client.execute(&endpoint, &options).await);
                    client.inner.in_flight.remove(&registered_key);
                    outcome
                }
                .boxed()
            });
            return shared.await;
        }

        if !self.is_online() {
            return self.enqueue(endpoint, options).await;
        }

        self.execute(endpoint, &options).await.into()
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ApiOutcome<T> {
        self.request(endpoint, RequestOptions::get()).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ApiOutcome<T> {
        self.send_json(endpoint, HttpMethod::Post, body).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ApiOutcome<T> {
        self.send_json(endpoint, HttpMethod::Put, body).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ApiOutcome<T> {
        self.send_json(endpoint, HttpMethod::Patch, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> ApiOutcome<T> {
        self.request(endpoint, RequestOptions::delete()).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        method: HttpMethod,
        body: &B,
    ) -> ApiOutcome<T> {
        match serde_json::to_value(body) {
            Ok(value) => {
                self.request(endpoint, RequestOptions::new(method).with_json(value))
                    .await
            }
            Err(e) => ApiOutcome::Failed(ApiFailure::invalid_payload(e.to_string())),
        }
    }

    // =========================================================================
    // Offline Queue
    // =========================================================================

    async fn enqueue(&self, endpoint: &str, options: RequestOptions) -> ApiOutcome<Value> {
        let item = QueuedRequest::new(endpoint, options);
        let queue_id = item.id.clone();

        match self.inner.queue.enqueue(item).await {
            Ok(()) => {
                info!(endpoint = %endpoint, id = %queue_id, "Offline, write queued");
                ApiOutcome::Queued { queue_id }
            }
            Err(e) => ApiOutcome::Failed(ApiFailure::storage(e.to_string())),
        }
    }

    /// Sends one queued write, bypassing the offline check and dedup.
    pub async fn replay(&self, item: &QueuedRequest) -> Result<(), String> {
        self.execute(&item.endpoint, &item.options)
            .await
            .map(|_| ())
            .map_err(|failure| failure.to_string())
    }

    /// Replays the offline queue in FIFO order. Skipped while offline.
    pub async fn drain_offline_queue(&self) -> DrainReport {
        if !self.is_online() {
            debug!("Offline, not draining queue");
            return DrainReport::skipped();
        }

        self.inner
            .queue
            .drain(|item| {
                let client = self.clone();
                async move { client.replay(&item).await }
            })
            .await
    }

    // =========================================================================
    // Execution
    // =========================================================================

    async fn execute(&self, endpoint: &str, options: &RequestOptions) -> Result<Value, ApiFailure> {
        let url = self.url_for(endpoint);
        let mut backoff = create_backoff(&self.inner.retry);
        let mut attempt: u32 = 0;
        let mut refreshed = false;

        loop {
            let access = if options.skip_auth {
                None
            } else {
                self.inner.tokens.access_token()
            };

            let request = build_request(&url, options, access.as_deref());
            let response = match self.send(request).await {
                Ok(response) => response,
                Err(failure) => {
                    if failure.is_retryable()
                        && !options.skip_retry
                        && self.inner.retry.should_retry(attempt)
                    {
                        self.wait_before_retry(&mut backoff, endpoint, attempt, &failure.error)
                            .await;
                        attempt += 1;
                        continue;
                    }
                    warn!(endpoint = %endpoint, attempt, code = %failure.code, "Request failed");
                    return Err(failure);
                }
            };

            if response.is_token_expired() && !options.skip_auth && !options.skip_refresh && !refreshed
            {
                refreshed = true;
                debug!(
                    endpoint = %endpoint,
                    joining = self.inner.refresh.is_refreshing(),
                    "Access token expired, refreshing"
                );
                self.refresh_access(access.as_deref()).await?;
                continue;
            }

            if !response.is_success() {
                if !options.skip_retry && self.inner.retry.should_retry_status(response.status, attempt)
                {
                    let reason = format!("HTTP {}", response.status);
                    self.wait_before_retry(&mut backoff, endpoint, attempt, &reason)
                        .await;
                    attempt += 1;
                    continue;
                }

                let failure = ApiFailure::from_response(response.status, &response.body);
                debug!(endpoint = %endpoint, status = response.status, code = %failure.code, "Request rejected");
                return Err(failure);
            }

            if options.method.is_read() {
                if !options.skip_cache {
                    self.inner.cache.insert(
                        fingerprint(endpoint, options),
                        response.body.clone(),
                        options.cache_ttl(),
                    );
                }
            } else {
                self.inner.cache.invalidate(resource_path(endpoint));
            }

            return Ok(response.body);
        }
    }

    /// Sends under the request timeout, mapping transport errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiFailure> {
        match tokio::time::timeout(self.inner.request_timeout, self.inner.transport.send(request))
            .await
        {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(TransportError::Network(e))) => Err(ApiFailure::network(e)),
            Ok(Err(TransportError::InvalidRequest(e))) => Err(ApiFailure::invalid_payload(e)),
            Ok(Err(TransportError::Timeout(_))) | Err(_) => Err(ApiFailure::timeout()),
        }
    }

    async fn wait_before_retry(
        &self,
        backoff: &mut ExponentialBackoff,
        endpoint: &str,
        attempt: u32,
        reason: &str,
    ) {
        let delay = backoff.next_backoff().unwrap_or(self.inner.retry.max_delay);
        warn!(
            endpoint = %endpoint,
            attempt,
            delay_ms = delay.as_millis() as u64,
            reason = %reason,
            "Retrying request"
        );
        tokio::time::sleep(delay).await;
    }

    // =========================================================================
    // Token Refresh
    // =========================================================================

    async fn refresh_access(&self, stale: Option<&str>) -> Result<String, ApiFailure> {
        self.inner
            .refresh
            .refresh(&self.inner.tokens, stale, |refresh_token| {
                self.call_refresh(refresh_token)
            })
            .await
    }

    async fn call_refresh(&self, refresh_token: String) -> Result<TokenPair, ApiFailure> {
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.url_for(&self.inner.refresh_path),
            headers: default_headers(true),
            body: Some(RequestBody::Json(json!({ "refreshToken": refresh_token }))),
        };

        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(ApiFailure::from_response(response.status, &response.body));
        }

        parse_token_pair(&response.body, &refresh_token)
            .ok_or_else(|| ApiFailure::invalid_payload("refresh response carries no access token"))
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Sets connectivity, returning the previous value.
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.inner.online.swap(online, Ordering::SeqCst);
        if previous != online {
            info!(online, "Connectivity changed");
        }
        previous
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.inner.queue
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.inner.in_flight
    }

    /// Configured interval between periodic queue drains.
    pub fn sync_interval(&self) -> Duration {
        self.inner.sync_interval
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.retry
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.inner.base_url, endpoint)
        } else {
            format!("{}/{}", self.inner.base_url, endpoint)
        }
    }

    // =========================================================================
    // Domain APIs
    // =========================================================================

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    pub fn patterns(&self) -> PatternsApi {
        PatternsApi::new(self.clone())
    }

    pub fn meals(&self) -> MealsApi {
        MealsApi::new(self.clone())
    }

    pub fn inventory(&self) -> InventoryApi {
        InventoryApi::new(self.clone())
    }

    pub fn prep(&self) -> PrepApi {
        PrepApi::new(self.clone())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Per-request backoff: `min(base * 2^attempt, max)` with no jitter.
fn create_backoff(policy: &RetryPolicy) -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: policy.base_delay,
        initial_interval: policy.base_delay,
        randomization_factor: 0.0,
        multiplier: 2.0,
        max_interval: policy.max_delay,
        max_elapsed_time: None, // Bounded by max_retries instead
        ..Default::default()
    }
}

fn default_headers(json_body: bool) -> Vec<(String, String)> {
    let mut headers = Vec::with_capacity(3);
    if json_body {
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }
    headers.push(("Accept".to_string(), "application/json".to_string()));
    headers
}

fn build_request(url: &str, options: &RequestOptions, access: Option<&str>) -> HttpRequest {
    let mut headers = default_headers(options.is_json());

    if let Some(token) = access {
        headers.push(("Authorization".to_string(), format!("Bearer {token}")));
    }

    for (name, value) in &options.headers {
        headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        headers.push((name.clone(), value.clone()));
    }

    HttpRequest {
        method: options.method,
        url: url.to_string(),
        headers,
        body: options.body.clone(),
    }
}

/// Reads a token pair from a refresh response, flat or wrapped in `data`.
/// A response without a new refresh token keeps the current one.
fn parse_token_pair(body: &Value, current_refresh: &str) -> Option<TokenPair> {
    let body = body.get("data").filter(|d| d.is_object()).unwrap_or(body);
    let access = body.get("accessToken")?.as_str()?;
    let refresh = body
        .get("refreshToken")
        .and_then(|v| v.as_str())
        .unwrap_or(current_refresh);

    let access_expires_in = body.get("accessExpiresIn").and_then(|v| v.as_i64());
    let refresh_expires_in = body.get("refreshExpiresIn").and_then(|v| v.as_i64());

    Some(TokenPair::new(access, refresh).with_expiry(access_expires_in, refresh_expires_in))
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("online", &self.is_online())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mealprep_core::ErrorCode;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport answering from a script and recording every request.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn push(&self, status: u16, body: Value) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(HttpResponse { status, body }));
        }

        fn push_error(&self, error: TransportError) {
            self.responses.lock().unwrap().push_back(Err(error));
        }

        fn seen(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
        }
    }

    fn client(transport: Arc<ScriptedTransport>) -> ApiClient {
        let mut config = ClientConfig::default();
        config.api.base_url = "http://test.local/api/".into();
        config.retry.base_delay_ms = 1;
        config.retry.max_delay_ms = 5;
        ApiClient::builder(config)
            .with_transport(transport)
            .build()
            .unwrap()
    }

    fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn test_url_and_default_headers() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(200, json!([]));
        let client = client(transport.clone());
        client.tokens().store(TokenPair::new("t1", "r1")).await;

        let outcome: ApiOutcome<Vec<Value>> = client.get("/patterns").await;
        assert!(outcome.is_success());

        let seen = transport.seen();
        assert_eq!(seen[0].url, "http://test.local/api/patterns");
        assert_eq!(header(&seen[0], "Authorization"), Some("Bearer t1"));
        assert_eq!(header(&seen[0], "Content-Type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_skip_auth_and_header_override() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(200, json!({}));
        let client = client(transport.clone());
        client.tokens().store(TokenPair::new("t1", "r1")).await;

        let options = RequestOptions::get()
            .skip_auth()
            .with_header("content-type", "text/plain");
        let _ = client.request_value("/health", options).await;

        let seen = transport.seen();
        assert_eq!(header(&seen[0], "Authorization"), None);
        assert_eq!(header(&seen[0], "Content-Type"), Some("text/plain"));
        let content_types = seen[0]
            .headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case("content-type"))
            .count();
        assert_eq!(content_types, 1);
    }

    #[tokio::test]
    async fn test_multipart_lets_transport_pick_content_type() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(201, json!({"ok": true}));
        let client = client(transport.clone());

        let options = RequestOptions::new(HttpMethod::Post).with_multipart(vec![
            mealprep_core::FormPart::file("photo", "a.jpg", "image/jpeg", vec![1]),
        ]);
        let _ = client.request_value("/meals/1/photo", options).await;

        assert_eq!(header(&transport.seen()[0], "Content-Type"), None);
    }

    #[tokio::test]
    async fn test_network_error_retried_then_surfaced() {
        let transport = Arc::new(ScriptedTransport::default());
        for _ in 0..4 {
            transport.push_error(TransportError::Network("connection refused".into()));
        }
        let client = client(transport.clone());

        let outcome = client.request_value("/patterns", RequestOptions::get()).await;
        assert_eq!(outcome.code(), Some(ErrorCode::NetworkError));
        assert_eq!(transport.seen().len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_request_not_retried() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_error(TransportError::InvalidRequest("bad mime".into()));
        transport.push(201, json!({"ok": true}));
        let client = client(transport.clone());

        let options = RequestOptions::new(HttpMethod::Post).with_multipart(vec![
            mealprep_core::FormPart::file("photo", "a.jpg", "not a mime", vec![1]),
        ]);
        let outcome = client.request_value("/meals/1/photo", options).await;

        assert_eq!(outcome.code(), Some(ErrorCode::InvalidPayload));
        assert_eq!(transport.seen().len(), 1);
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let mut backoff = create_backoff(&RetryPolicy::default());
        let delays: Vec<u128> = (0..7)
            .map(|_| backoff.next_backoff().unwrap().as_millis())
            .collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000]);
    }

    #[test]
    fn test_backoff_restarts_per_request() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(40));

        let mut first = create_backoff(&policy);
        first.next_backoff();
        first.next_backoff();
        assert_eq!(first.next_backoff(), Some(Duration::from_millis(40)));

        let mut second = create_backoff(&policy);
        assert_eq!(second.next_backoff(), Some(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn test_skip_retry() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(503, json!({"error": "down"}));
        let client = client(transport.clone());

        let outcome = client
            .request_value("/patterns", RequestOptions::get().skip_retry())
            .await;
        assert_eq!(outcome.code().map(|c| c.to_string()), Some("HTTP_503".into()));
        assert_eq!(transport.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_skip_cache_neither_reads_nor_writes_cache() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(200, json!(1));
        transport.push(200, json!(2));
        let client = client(transport.clone());

        let first = client
            .request_value("/stats", RequestOptions::get().skip_cache())
            .await;
        assert_eq!(first.into_data(), Some(json!(1)));
        assert!(client.cache().is_empty());

        let second = client.request_value("/stats", RequestOptions::get()).await;
        assert_eq!(second, ApiOutcome::success(json!(2)));
    }

    #[tokio::test]
    async fn test_offline_write_is_queued_and_replayed() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(201, json!({"id": "m1"}));
        let client = client(transport.clone());
        client.set_online(false);

        let outcome = client
            .request_value("/meals", RequestOptions::post(json!({"name": "Chili"})))
            .await;
        assert!(outcome.is_queued());
        assert_eq!(client.queue().len().await, 1);
        assert!(transport.seen().is_empty());

        assert!(client.drain_offline_queue().await.skipped);

        client.set_online(true);
        let report = client.drain_offline_queue().await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(client.queue().len().await, 0);
        assert_eq!(transport.seen()[0].method, HttpMethod::Post);
    }

    #[tokio::test]
    async fn test_second_token_expired_is_surfaced() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(401, json!({"code": "TOKEN_EXPIRED", "error": "expired"}));
        transport.push(200, json!({"accessToken": "t2", "refreshToken": "r2"}));
        transport.push(401, json!({"code": "TOKEN_EXPIRED", "error": "expired"}));
        let client = client(transport.clone());
        client.tokens().store(TokenPair::new("t1", "r1")).await;

        let outcome = client.request_value("/me", RequestOptions::get()).await;
        assert_eq!(outcome.code(), Some(ErrorCode::TokenExpired));
        assert_eq!(transport.seen().len(), 3);
        assert_eq!(client.tokens().access_token().as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn test_skip_refresh_surfaces_token_expired() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(401, json!({"code": "TOKEN_EXPIRED", "error": "expired"}));
        let client = client(transport.clone());
        client.tokens().store(TokenPair::new("t1", "r1")).await;

        let outcome = client
            .request_value("/me", RequestOptions::get().skip_refresh())
            .await;
        assert_eq!(outcome.code(), Some(ErrorCode::TokenExpired));
        assert_eq!(transport.seen().len(), 1);
        assert!(client.tokens().has_session());
    }

    #[test]
    fn test_parse_token_pair() {
        let flat = parse_token_pair(&json!({"accessToken": "a", "refreshToken": "r"}), "old").unwrap();
        assert_eq!(flat.refresh_token, "r");

        let wrapped = parse_token_pair(&json!({"data": {"accessToken": "a"}}), "old").unwrap();
        assert_eq!(wrapped.refresh_token, "old");

        assert!(parse_token_pair(&json!({"token": "x"}), "old").is_none());
    }

    #[tokio::test]
    async fn test_undecodable_body_is_invalid_payload() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(200, json!({"unexpected": true}));
        let client = client(transport);

        let outcome: ApiOutcome<Vec<String>> = client.get("/patterns").await;
        assert_eq!(outcome.code(), Some(ErrorCode::InvalidPayload));
    }
}
