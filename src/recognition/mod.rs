//! Food recognition: two prompt profiles over one vision model, and the
//! processor that decides which of them answers.

pub mod handlers;
mod model;
mod processor;
mod prompts;
mod recognizer;
mod result;

pub use model::{GeminiClient, VisionModel};
pub use processor::{ImageProcessor, PreferMethod};
pub use result::{RecognitionError, RecognitionMethod, RecognitionResult};

#[cfg(test)]
pub(crate) use processor::tests::one_pixel_png;
#[cfg(test)]
pub(crate) use recognizer::tests::{chicken_answer, FakeModel};
