use mealprep_core::models::{NewPrepSession, PrepSession, PrepStatus};
use mealprep_core::ApiOutcome;
use serde_json::{json, Value};

use crate::pipeline::ApiClient;

/// Batch prep sessions and their task lists.
pub struct PrepApi {
    client: ApiClient,
}

impl PrepApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        PrepApi { client }
    }

    pub async fn sessions(&self) -> ApiOutcome<Vec<PrepSession>> {
        self.client.get("/prep/sessions").await
    }

    pub async fn session(&self, id: &str) -> ApiOutcome<PrepSession> {
        self.client.get(&format!("/prep/sessions/{id}")).await
    }

    pub async fn create(&self, session: &NewPrepSession) -> ApiOutcome<PrepSession> {
        self.client.post("/prep/sessions", session).await
    }

    pub async fn set_status(&self, id: &str, status: PrepStatus) -> ApiOutcome<PrepSession> {
        self.client
            .patch(&format!("/prep/sessions/{id}"), &json!({ "status": status }))
            .await
    }

    pub async fn complete_task(&self, session_id: &str, task_id: &str) -> ApiOutcome<PrepSession> {
        self.client
            .patch(
                &format!("/prep/sessions/{session_id}/tasks/{task_id}"),
                &json!({ "done": true }),
            )
            .await
    }

    pub async fn delete(&self, id: &str) -> ApiOutcome<Value> {
        self.client.delete(&format!("/prep/sessions/{id}")).await
    }
}
