//! # Domain APIs
//!
//! Thin typed wrappers over [`ApiClient`](crate::ApiClient). Each one only
//! names endpoints and payload types; caching, dedup, refresh, retry and
//! offline queueing all happen in the pipeline.
//!
//! ```text
//! ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌──────────┐
//! │ AuthApi  │ │ Patterns │ │  Meals   │ │ Inventory │ │   Prep   │
//! └────┬─────┘ └────┬─────┘ └────┬─────┘ └─────┬─────┘ └────┬─────┘
//!      └────────────┴────────────┼─────────────┴────────────┘
//!                                ▼
//!                      ApiClient::request<T>
//! ```

mod auth;
mod inventory;
mod meals;
mod patterns;
mod prep;

pub use auth::AuthApi;
pub use inventory::InventoryApi;
pub use meals::MealsApi;
pub use patterns::PatternsApi;
pub use prep::PrepApi;

use mealprep_core::{ApiFailure, HttpMethod, RequestOptions};
use serde::Serialize;

/// Builds write options carrying `body` as JSON.
pub(crate) fn json_options<B: Serialize + ?Sized>(
    method: HttpMethod,
    body: &B,
) -> Result<RequestOptions, ApiFailure> {
    serde_json::to_value(body)
        .map(|value| RequestOptions::new(method).with_json(value))
        .map_err(|e| ApiFailure::invalid_payload(e.to_string()))
}
