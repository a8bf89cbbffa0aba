use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Where an entry's calorie figure came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EntrySource {
    Label,
    Estimate,
    Manual,
}

/// Row of the `calories` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalorieEntry {
    pub id: i64,
    pub user_id: i64,
    pub calories: f64,
    pub food_name: Option<String>,
    pub food_type: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub source: EntrySource,
    pub image_path: Option<String>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Entry not yet written to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCalorieEntry {
    pub user_id: i64,
    pub calories: f64,
    pub food_name: Option<String>,
    pub food_type: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub source: EntrySource,
    pub image_path: Option<String>,
    pub notes: Option<String>,
    pub logged_at: OffsetDateTime,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalorieEntryPatch {
    pub calories: Option<f64>,
    pub food_name: Option<String>,
    pub food_type: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub logged_at: Option<OffsetDateTime>,
}
