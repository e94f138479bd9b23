use chrono::NaiveDate;
use mealprep_core::models::{Meal, NewMeal};
use mealprep_core::{ApiOutcome, FormPart, HttpMethod, RequestOptions};
use serde_json::Value;

use crate::pipeline::ApiClient;

/// Meals eaten, with nutrition and photos.
pub struct MealsApi {
    client: ApiClient,
}

impl MealsApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        MealsApi { client }
    }

    /// Meals of one day, or all meals when `date` is None.
    pub async fn list(&self, date: Option<NaiveDate>) -> ApiOutcome<Vec<Meal>> {
        match date {
            Some(date) => self.client.get(&format!("/meals?date={date}")).await,
            None => self.client.get("/meals").await,
        }
    }

    pub async fn get(&self, id: &str) -> ApiOutcome<Meal> {
        self.client.get(&format!("/meals/{id}")).await
    }

    pub async fn create(&self, meal: &NewMeal) -> ApiOutcome<Meal> {
        self.client.post("/meals", meal).await
    }

    pub async fn update(&self, id: &str, meal: &NewMeal) -> ApiOutcome<Meal> {
        self.client.put(&format!("/meals/{id}"), meal).await
    }

    pub async fn delete(&self, id: &str) -> ApiOutcome<Value> {
        self.client.delete(&format!("/meals/{id}")).await
    }

    /// Uploads a photo as `multipart/form-data` (field `photo`).
    ///
    /// Offline uploads are queued like any other write; the bytes travel
    /// inside the persisted queue item.
    pub async fn upload_photo(
        &self,
        id: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> ApiOutcome<Meal> {
        let options = RequestOptions::new(HttpMethod::Post).with_multipart(vec![FormPart::file(
            "photo",
            file_name,
            content_type,
            bytes,
        )]);
        self.client
            .request(&format!("/meals/{id}/photo"), options)
            .await
    }
}
