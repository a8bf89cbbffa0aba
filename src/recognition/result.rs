use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which recognizer produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionMethod {
    LabelRecognition,
    VisualEstimation,
}

impl RecognitionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RecognitionMethod::LabelRecognition => "label_recognition",
            RecognitionMethod::VisualEstimation => "visual_estimation",
        }
    }
}

impl std::fmt::Display for RecognitionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One food item reported by the vision model. Keys outside this set make
/// the whole answer malformed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FoodItemDetection {
    pub calories: f64,
    pub food_name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub food_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Shape the model is asked to answer with. Every field without a default
/// is required; a missing one fails the parse.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ModelResponse {
    pub detected_items: Vec<FoodItemDetection>,
    pub estimated_calories: f64,
    pub confidence_score: f64,
}

/// Why a single recognizer call produced no usable answer.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("vision model request failed: {0:#}")]
    Model(anyhow::Error),
    #[error("model returned malformed JSON: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

/// Outcome of one recognizer invocation.
///
/// A successful result never carries an error message; a failed one never
/// carries detected items. Both are only built through [`RecognitionResult::succeeded`]
/// and [`RecognitionResult::failed`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecognitionResult {
    success: bool,
    method: RecognitionMethod,
    detected_items: Vec<FoodItemDetection>,
    estimated_calories: Option<f64>,
    confidence_score: Option<f64>,
    error_message: Option<String>,
    raw_data: Option<serde_json::Value>,
}

impl RecognitionResult {
    pub(crate) fn succeeded(
        method: RecognitionMethod,
        response: ModelResponse,
        raw_data: serde_json::Value,
    ) -> Self {
        Self {
            success: true,
            method,
            detected_items: response.detected_items,
            estimated_calories: Some(response.estimated_calories),
            confidence_score: Some(response.confidence_score),
            error_message: None,
            raw_data: Some(raw_data),
        }
    }

    pub fn failed(method: RecognitionMethod, error: &RecognitionError) -> Self {
        Self {
            success: false,
            method,
            detected_items: Vec::new(),
            estimated_calories: None,
            confidence_score: None,
            error_message: Some(error.to_string()),
            raw_data: None,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn method(&self) -> RecognitionMethod {
        self.method
    }

    pub fn detected_items(&self) -> &[FoodItemDetection] {
        &self.detected_items
    }

    pub fn estimated_calories(&self) -> Option<f64> {
        self.estimated_calories
    }

    pub fn confidence_score(&self) -> Option<f64> {
        self.confidence_score
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn raw_data(&self) -> Option<&serde_json::Value> {
        self.raw_data.as_ref()
    }
}
