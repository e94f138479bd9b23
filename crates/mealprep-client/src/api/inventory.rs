use mealprep_core::models::{InventoryItem, NewInventoryItem};
use mealprep_core::ApiOutcome;
use serde_json::{json, Value};

use crate::pipeline::ApiClient;

/// Pantry inventory.
pub struct InventoryApi {
    client: ApiClient,
}

impl InventoryApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        InventoryApi { client }
    }

    pub async fn list(&self) -> ApiOutcome<Vec<InventoryItem>> {
        self.client.get("/inventory").await
    }

    /// Items expiring within `days`.
    pub async fn expiring(&self, days: u32) -> ApiOutcome<Vec<InventoryItem>> {
        self.client
            .get(&format!("/inventory?expiring_within={days}"))
            .await
    }

    pub async fn add(&self, item: &NewInventoryItem) -> ApiOutcome<InventoryItem> {
        self.client.post("/inventory", item).await
    }

    pub async fn update(&self, id: &str, item: &NewInventoryItem) -> ApiOutcome<InventoryItem> {
        self.client.put(&format!("/inventory/{id}"), item).await
    }

    pub async fn adjust_quantity(&self, id: &str, quantity: f64) -> ApiOutcome<InventoryItem> {
        self.client
            .patch(&format!("/inventory/{id}"), &json!({ "quantity": quantity }))
            .await
    }

    pub async fn remove(&self, id: &str) -> ApiOutcome<Value> {
        self.client.delete(&format!("/inventory/{id}")).await
    }
}
