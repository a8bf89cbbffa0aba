use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::CalorieEntry;
use crate::recognition::RecognitionResult;

/// Manual log entry from the form.
#[derive(Debug, Deserialize)]
pub struct ManualEntryRequest {
    pub calories: f64,
    pub food_name: String,
    pub food_type: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub logged_at: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageLogResponse {
    pub result: RecognitionResult,
    pub entries: Vec<CalorieEntry>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 20 }

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}
fn default_days() -> i64 { 7 }
