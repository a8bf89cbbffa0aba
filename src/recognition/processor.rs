use std::sync::Arc;

use tracing::{debug, info};

use super::model::VisionModel;
use super::recognizer::Recognizer;
use super::result::RecognitionResult;

/// Recognizer to try first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferMethod {
    Label,
    Visual,
}

impl PreferMethod {
    /// Parses a form value; `auto` and blank mean no preference.
    pub fn parse(value: &str) -> Result<Option<Self>, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(None),
            "label" => Ok(Some(PreferMethod::Label)),
            "visual" => Ok(Some(PreferMethod::Visual)),
            other => Err(format!("unknown recognition method: {other}")),
        }
    }
}

/// True when the bytes decode as an image in a supported format.
pub fn validate_image(image: &[u8]) -> bool {
    match image::load_from_memory(image) {
        Ok(_) => true,
        Err(e) => {
            debug!(error = %e, bytes = image.len(), "image validation failed");
            false
        }
    }
}

pub struct ImageProcessor {
    label: Recognizer,
    visual: Recognizer,
}

impl ImageProcessor {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self::with_models(model.clone(), model)
    }

    /// Separate model handles for the label and visual recognizers.
    pub fn with_models(label: Arc<dyn VisionModel>, visual: Arc<dyn VisionModel>) -> Self {
        Self {
            label: Recognizer::label(label),
            visual: Recognizer::visual(visual),
        }
    }

    pub fn validate_image(&self, image: &[u8]) -> bool {
        validate_image(image)
    }

    /// With a preference, the preferred recognizer runs first and the other
    /// one only if it fails; the fallback's result is final either way.
    /// Without one, both run in turn and a successful label result wins
    /// over whatever the visual recognizer returned.
    pub async fn process_image(
        &self,
        image: &[u8],
        prefer: Option<PreferMethod>,
    ) -> RecognitionResult {
        let (first, second) = match prefer {
            Some(PreferMethod::Label) => (&self.label, &self.visual),
            Some(PreferMethod::Visual) => (&self.visual, &self.label),
            None => {
                let label_result = self.label.recognize(image).await;
                let visual_result = self.visual.recognize(image).await;
                return if label_result.success() {
                    label_result
                } else {
                    visual_result
                };
            }
        };

        let result = first.recognize(image).await;
        if result.success() {
            return result;
        }
        info!(
            failed = %first.method(),
            fallback = %second.method(),
            "falling back to second recognizer"
        );
        second.recognize(image).await
    }
}
