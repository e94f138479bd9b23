use chrono::NaiveDate;
use mealprep_core::models::{NewPatternLog, PatternLog, PatternType};
use mealprep_core::ApiOutcome;

use crate::pipeline::ApiClient;

/// Eating patterns and daily adherence logs.
pub struct PatternsApi {
    client: ApiClient,
}

impl PatternsApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        PatternsApi { client }
    }

    /// Patterns the server offers.
    pub async fn list(&self) -> ApiOutcome<Vec<PatternType>> {
        self.client.get("/patterns").await
    }

    /// Logs in `[from, to]`, both bounds optional.
    pub async fn logs(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ApiOutcome<Vec<PatternLog>> {
        let mut query = Vec::new();
        if let Some(from) = from {
            query.push(format!("from={from}"));
        }
        if let Some(to) = to {
            query.push(format!("to={to}"));
        }

        let endpoint = if query.is_empty() {
            "/patterns/logs".to_string()
        } else {
            format!("/patterns/logs?{}", query.join("&"))
        };
        self.client.get(&endpoint).await
    }

    pub async fn log(&self, id: &str) -> ApiOutcome<PatternLog> {
        self.client.get(&format!("/patterns/logs/{id}")).await
    }

    pub async fn create_log(&self, log: &NewPatternLog) -> ApiOutcome<PatternLog> {
        self.client.post("/patterns/logs", log).await
    }

    pub async fn update_log(&self, id: &str, log: &NewPatternLog) -> ApiOutcome<PatternLog> {
        self.client.put(&format!("/patterns/logs/{id}"), log).await
    }

    pub async fn delete_log(&self, id: &str) -> ApiOutcome<serde_json::Value> {
        self.client.delete(&format!("/patterns/logs/{id}")).await
    }
}
