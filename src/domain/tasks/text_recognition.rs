//! Text recognition capability.
//!
//! A recognizer reads the text inside caller-provided polygons. Options mirror
//! what the notes pipeline needs to control: the task mode, whether the
//! recognizer may reorder lines itself, and the decode budget.

use crate::core::errors::NotesResult;
use crate::core::{ConfigError, ConfigValidator};
use crate::processors::BoundingBox;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Recognition task mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionTask {
    /// Recognize whole images as single lines.
    Ocr,
    /// Recognize inside the provided polygons.
    #[default]
    OcrWithBoxes,
}

impl RecognitionTask {
    /// Returns the task name used on the wire and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionTask::Ocr => "ocr",
            RecognitionTask::OcrWithBoxes => "ocr_with_boxes",
        }
    }
}

/// Options passed to a [`TextRecognizer`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionOptions {
    /// Task mode (default: ocr_with_boxes)
    pub task: RecognitionTask,
    /// Let the recognizer reorder lines by position (default: false)
    pub sort_lines: bool,
    /// Drop a line whose text repeats the previous line (default: false)
    pub drop_repeated_text: bool,
    /// Maximum line crops per model invocation (default: 16)
    pub batch_size: usize,
    /// Maximum decoded characters per line (default: 2048)
    pub max_tokens: usize,
    /// Maximum resized line width in pixels (default: 2148)
    pub max_sliding_window: usize,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            task: RecognitionTask::OcrWithBoxes,
            sort_lines: false,
            drop_repeated_text: false,
            batch_size: 16,
            max_tokens: 2048,
            max_sliding_window: 2148,
        }
    }
}

impl ConfigValidator for RecognitionOptions {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_positive("recognition.batch_size", self.batch_size)?;
        self.validate_positive("recognition.max_tokens", self.max_tokens)?;
        self.validate_positive("recognition.max_sliding_window", self.max_sliding_window)?;
        Ok(())
    }
}

/// One recognized line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Recognized text
    pub text: String,
    /// Mean character confidence
    pub confidence: f32,
    /// Polygon the text was read from
    pub polygon: BoundingBox,
}

/// Recognition output for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutput {
    /// Lines in the order the polygons were given, unless `sort_lines` was set
    pub text_lines: Vec<TextLine>,
}

/// Reads text inside provided polygons.
///
/// Implementations are shared across extraction calls and must not keep
/// per-call mutable state.
pub trait TextRecognizer: Send + Sync {
    /// Recognizes text for each image inside its polygons.
    ///
    /// `polygons[i]` belongs to `images[i]`.
    fn recognize(
        &self,
        images: &[RgbImage],
        polygons: &[Vec<BoundingBox>],
        options: &RecognitionOptions,
    ) -> NotesResult<Vec<RecognitionOutput>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RecognitionOptions::default();
        assert_eq!(options.task.as_str(), "ocr_with_boxes");
        assert!(!options.sort_lines);
        assert!(!options.drop_repeated_text);
        assert_eq!(options.max_tokens, 2048);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: RecognitionOptions =
            serde_json::from_str(r#"{"task": "ocr", "batch_size": 4}"#).unwrap();
        assert_eq!(options.task, RecognitionTask::Ocr);
        assert_eq!(options.batch_size, 4);
        assert_eq!(options.max_sliding_window, 2148);
    }
}
