//! # Domain Payloads
//!
//! Request and response bodies of the domain API modules.
//!
//! ## Entity Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Payloads                                 │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  PatternLog     │   │      Meal       │   │ InventoryItem   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  date           │   │  name, timing   │   │  name, category │       │
//! │  │  planned/actual │   │  nutrition      │   │  quantity, unit │       │
//! │  │  adherence      │   │  photo_url      │   │  expires_on     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  PatternType    │   │  PrepSession    │   │  UserProfile    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  7 patterns     │   │  status, tasks  │   │  targets        │       │
//! │  │  (A..G)         │   │  timer          │   │  weights        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ids are server-assigned strings (UUID v4 on the backend). Timestamps are
//! RFC 3339.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// The signed-in user with baseline targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub target_calories: Option<u32>,
    #[serde(default)]
    pub target_protein_g: Option<u32>,
    #[serde(default)]
    pub starting_weight_lbs: Option<f64>,
    #[serde(default)]
    pub target_weight_lbs: Option<f64>,
}

/// Body of a successful login or registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,

    /// Access token lifetime in seconds.
    #[serde(default)]
    pub access_expires_in: Option<i64>,

    /// Refresh token lifetime in seconds.
    #[serde(default)]
    pub refresh_expires_in: Option<i64>,
}

// =============================================================================
// Patterns
// =============================================================================

/// The seven eating patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PatternType {
    /// A: three meals, standard timing.
    Traditional,
    /// B: heavy lunch, light dinner.
    Reversed,
    /// C: 12PM-8PM eating window.
    IfNoon,
    /// D: four mini-meals.
    #[serde(rename = "grazing_4")]
    Grazing4,
    /// E: all-day platter.
    GrazingPlatter,
    /// F: large breakfast.
    BigBreakfast,
    /// G: 5AM-1PM eating window.
    MorningFeast,
}

/// A day's pattern log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PatternLog {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub pattern_planned: PatternType,
    #[serde(default)]
    pub pattern_actual: Option<PatternType>,
    /// 0.0 - 1.0
    #[serde(default)]
    pub adherence_score: f64,
    #[serde(default)]
    pub energy_rating: Option<u8>,
    #[serde(default)]
    pub satisfaction_rating: Option<u8>,
    #[serde(default)]
    pub hunger_rating: Option<u8>,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewPatternLog {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub pattern_planned: PatternType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_actual: Option<PatternType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hunger_rating: Option<u8>,
}

// =============================================================================
// Meals
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MealTiming {
    Morning,
    LateMorning,
    Noon,
    Afternoon,
    Evening,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NutritionInfo {
    pub calories: f64,
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default)]
    pub fiber_g: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Meal {
    pub id: String,
    pub name: String,
    pub timing: MealTiming,
    #[serde(default)]
    pub nutrition: NutritionInfo,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub eaten_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewMeal {
    pub name: String,
    pub timing: MealTiming,
    #[serde(default)]
    pub nutrition: NutritionInfo,
    #[ts(as = "Option<String>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eaten_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Inventory
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    /// protein, carb, vegetable, fat, flavor
    #[serde(default)]
    pub category: Option<String>,
    pub quantity: f64,
    pub unit: String,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewInventoryItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub quantity: f64,
    pub unit: String,
    #[ts(as = "Option<String>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
}

// =============================================================================
// Prep Sessions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PrepStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PrepTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub duration_min: Option<u32>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PrepSession {
    pub id: String,
    pub title: String,
    pub status: PrepStatus,
    #[serde(default)]
    pub tasks: Vec<PrepTask>,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewPrepSession {
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[ts(as = "Option<String>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
}
