use std::sync::Arc;

use tracing::{debug, warn};

use super::model::{mime_type_for, VisionModel};
use super::prompts;
use super::result::{ModelResponse, RecognitionError, RecognitionMethod, RecognitionResult};

/// Turns image bytes into a [`RecognitionResult`] through one model call.
///
/// The two variants share the call shape and response schema; only the
/// prompt and the method tag differ.
#[derive(Clone)]
pub struct Recognizer {
    method: RecognitionMethod,
    model: Arc<dyn VisionModel>,
}

impl Recognizer {
    /// Reads a printed nutrition label.
    pub fn label(model: Arc<dyn VisionModel>) -> Self {
        Self {
            method: RecognitionMethod::LabelRecognition,
            model,
        }
    }

    /// Estimates calories from a photo of plated food.
    pub fn visual(model: Arc<dyn VisionModel>) -> Self {
        Self {
            method: RecognitionMethod::VisualEstimation,
            model,
        }
    }

    pub fn method(&self) -> RecognitionMethod {
        self.method
    }

    fn prompt(&self) -> String {
        match self.method {
            RecognitionMethod::LabelRecognition => prompts::label_prompt(),
            RecognitionMethod::VisualEstimation => prompts::visual_prompt(),
        }
    }

    /// Never fails: every error becomes an unsuccessful result.
    pub async fn recognize(&self, image: &[u8]) -> RecognitionResult {
        match self.try_recognize(image).await {
            Ok((response, raw)) => {
                debug!(
                    method = %self.method,
                    items = response.detected_items.len(),
                    "recognition succeeded"
                );
                RecognitionResult::succeeded(self.method, response, raw)
            }
            Err(e) => {
                warn!(method = %self.method, error = %e, "recognition failed");
                RecognitionResult::failed(self.method, &e)
            }
        }
    }

    async fn try_recognize(
        &self,
        image: &[u8],
    ) -> Result<(ModelResponse, serde_json::Value), RecognitionError> {
        let text = self
            .model
            .generate(&self.prompt(), image, mime_type_for(image))
            .await
            .map_err(RecognitionError::Model)?;

        let raw: serde_json::Value = serde_json::from_str(&text)?;
        let response: ModelResponse = serde_json::from_value(raw.clone())?;
        Ok((response, raw))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays one canned answer and records the prompts it saw.
    pub(crate) struct FakeModel {
        answer: Result<String, String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl FakeModel {
        pub(crate) fn answering(text: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(text.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing(message: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                answer: Err(message.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl VisionModel for FakeModel {
        async fn generate(
            &self,
            prompt: &str,
            _image: &[u8],
            _mime_type: &str,
        ) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(msg) => Err(anyhow::anyhow!(msg.clone())),
            }
        }
    }

    pub(crate) fn chicken_answer() -> String {
        json!({
            "detected_items": [
                {"calories": 350, "food_name": "Grilled Chicken", "quantity": 1, "unit": "serving"}
            ],
            "estimated_calories": 350,
            "confidence_score": 0.8
        })
        .to_string()
    }

    #[tokio::test]
    async fn copies_every_item_verbatim() {
        let answer = json!({
            "detected_items": [
                {"calories": 120.5, "food_name": "Yogurt", "food_type": "dairy", "quantity": 150,
                 "unit": "grams", "source": "label", "notes": "plain", "confidence": 0.9},
                {"calories": 95, "food_name": "Apple", "quantity": 1, "unit": "piece"}
            ],
            "estimated_calories": 215.5,
            "confidence_score": 0.7
        });
        let model = FakeModel::answering(answer.to_string());
        let result = Recognizer::label(model).recognize(b"img").await;

        assert!(result.success());
        assert_eq!(result.method(), RecognitionMethod::LabelRecognition);
        let items = result.detected_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].food_name, "Yogurt");
        assert_eq!(items[0].calories, 120.5);
        assert_eq!(items[0].quantity, 150.0);
        assert_eq!(items[0].unit, "grams");
        assert_eq!(items[0].food_type.as_deref(), Some("dairy"));
        assert_eq!(items[0].notes.as_deref(), Some("plain"));
        assert_eq!(items[0].confidence, Some(0.9));
        assert_eq!(items[1].food_name, "Apple");
        assert_eq!(result.estimated_calories(), Some(215.5));
        assert_eq!(result.confidence_score(), Some(0.7));
        assert_eq!(result.raw_data(), Some(&answer));
        assert!(result.error_message().is_none());
    }

    #[tokio::test]
    async fn empty_item_list_is_still_a_success() {
        let model = FakeModel::answering(
            r#"{"detected_items": [], "estimated_calories": 0, "confidence_score": 0.1}"#,
        );
        let result = Recognizer::visual(model).recognize(b"img").await;
        assert!(result.success());
        assert!(result.detected_items().is_empty());
    }

    #[tokio::test]
    async fn non_json_answer_becomes_failure() {
        let model = FakeModel::answering("Sure! Here is the JSON you asked for");
        let result = Recognizer::visual(model).recognize(b"img").await;
        assert!(!result.success());
        assert_eq!(result.method(), RecognitionMethod::VisualEstimation);
        assert!(result.detected_items().is_empty());
        assert!(result
            .error_message()
            .unwrap()
            .starts_with("model returned malformed JSON"));
    }

    #[tokio::test]
    async fn missing_required_item_field_becomes_failure() {
        let model = FakeModel::answering(
            r#"{"detected_items": [{"calories": 10, "quantity": 1, "unit": "g"}],
                "estimated_calories": 10, "confidence_score": 0.5}"#,
        );
        let result = Recognizer::label(model).recognize(b"img").await;
        assert!(!result.success());
        assert!(result.error_message().unwrap().contains("food_name"));
    }

    #[tokio::test]
    async fn unexpected_item_key_becomes_failure() {
        let model = FakeModel::answering(
            r#"{"detected_items": [{"calories": 10, "food_name": "Tea", "quantity": 1,
                "unit": "cup", "brand": "Acme"}],
                "estimated_calories": 10, "confidence_score": 0.5}"#,
        );
        let result = Recognizer::label(model).recognize(b"img").await;
        assert!(!result.success());
        assert!(result.error_message().unwrap().contains("brand"));
    }

    #[tokio::test]
    async fn model_error_becomes_failure_with_message() {
        let model = FakeModel::failing("connection refused");
        let result = Recognizer::label(model).recognize(b"img").await;
        assert!(!result.success());
        assert_eq!(
            result.error_message(),
            Some("vision model request failed: connection refused")
        );
    }

    #[tokio::test]
    async fn each_variant_sends_its_own_prompt() {
        let model = FakeModel::answering(chicken_answer());
        Recognizer::label(model.clone()).recognize(b"img").await;
        Recognizer::visual(model.clone()).recognize(b"img").await;

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts[0], prompts::label_prompt());
        assert_eq!(prompts[1], prompts::visual_prompt());
    }
}
