use mealprep_core::models::{AuthResponse, Credentials, RegisterRequest, UserProfile};
use mealprep_core::{ApiFailure, ApiOutcome, HttpMethod, RequestOptions, TokenPair};
use tracing::{debug, info};

use super::json_options;
use crate::pipeline::ApiClient;

/// Session lifecycle: login, register, logout.
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        AuthApi { client }
    }

    pub async fn login(&self, credentials: &Credentials) -> ApiOutcome<UserProfile> {
        self.authenticate("/auth/login", credentials).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> ApiOutcome<UserProfile> {
        self.authenticate("/auth/register", request).await
    }

    /// Revokes the session on the server if possible, then always clears
    /// local tokens and cached responses.
    pub async fn logout(&self) {
        if self.client.tokens().has_session() && self.client.is_online() {
            let options = RequestOptions::new(HttpMethod::Post)
                .skip_refresh()
                .skip_retry();
            let outcome = self.client.request_value("/auth/logout", options).await;
            if let Some(failure) = outcome.failure() {
                debug!(code = %failure.code, "Server logout failed, clearing session locally");
            }
        }

        self.client.tokens().clear().await;
        self.client.clear_cache();
        info!("Logged out");
    }

    pub async fn current_user(&self) -> ApiOutcome<UserProfile> {
        self.client.get("/auth/me").await
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.tokens().has_session()
    }

    /// Credential exchanges are never queued: without a connection there is
    /// no session to hand back.
    async fn authenticate<B: serde::Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ApiOutcome<UserProfile> {
        if !self.client.is_online() {
            return ApiOutcome::Failed(ApiFailure::network("offline"));
        }

        let options = match json_options(HttpMethod::Post, body) {
            Ok(options) => options.skip_auth().skip_refresh(),
            Err(failure) => return ApiOutcome::Failed(failure),
        };

        match self.client.request::<AuthResponse>(endpoint, options).await {
            ApiOutcome::Success { data, from_cache } => {
                let pair = TokenPair::new(data.access_token, data.refresh_token)
                    .with_expiry(data.access_expires_in, data.refresh_expires_in);
                self.client.tokens().store(pair).await;
                info!(user_id = %data.user.id, "Session started");
                ApiOutcome::Success {
                    data: data.user,
                    from_cache,
                }
            }
            other => other.map(|response| response.user),
        }
    }
}
