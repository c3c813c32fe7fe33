//! The capability handle passed to every extraction.
//!
//! [`OcrModels`] is built once, then shared read-only (it is cheap to clone).
//! A handle may be missing either capability; asking for a missing one yields
//! [`NotesError::ModelUnavailable`] instead of loading anything on the fly.

use crate::core::config::OrtSessionConfig;
use crate::core::errors::{NotesError, NotesResult};
use crate::domain::adapters::{OnnxTextDetector, OnnxTextRecognizer};
use crate::domain::tasks::{TextDetectionConfig, TextDetector, TextRecognizer};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Detection and recognition capabilities used by the notes pipeline.
#[derive(Clone, Default)]
pub struct OcrModels {
    detector: Option<Arc<dyn TextDetector>>,
    recognizer: Option<Arc<dyn TextRecognizer>>,
}

impl fmt::Debug for OcrModels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrModels")
            .field("detector", &self.detector.is_some())
            .field("recognizer", &self.recognizer.is_some())
            .finish()
    }
}

impl OcrModels {
    /// Creates a handle holding both capabilities.
    pub fn new(detector: Arc<dyn TextDetector>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            detector: Some(detector),
            recognizer: Some(recognizer),
        }
    }

    /// Creates a handle with no capabilities loaded.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Replaces the detection capability.
    pub fn with_detector(mut self, detector: Arc<dyn TextDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Replaces the recognition capability.
    pub fn with_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Loads the ONNX detection and recognition models.
    ///
    /// # Arguments
    ///
    /// * `det_model` - Path to the DB detection model
    /// * `rec_model` - Path to the CTC recognition model
    /// * `dict_path` - Character dictionary for the recognition model
    /// * `det_config` - Detection thresholds and resize limit
    /// * `ort_config` - Optional session settings applied to both models
    pub fn from_paths(
        det_model: &Path,
        rec_model: &Path,
        dict_path: &Path,
        det_config: TextDetectionConfig,
        ort_config: Option<OrtSessionConfig>,
    ) -> NotesResult<Self> {
        let mut det_builder = OnnxTextDetector::builder().with_config(det_config);
        let mut rec_builder = OnnxTextRecognizer::builder();
        if let Some(cfg) = ort_config {
            det_builder = det_builder.with_ort_config(cfg.clone());
            rec_builder = rec_builder.with_ort_config(cfg);
        }

        let detector = det_builder.build(det_model)?;
        let recognizer = rec_builder.build(rec_model, dict_path)?;
        Ok(Self::new(Arc::new(detector), Arc::new(recognizer)))
    }

    /// Returns the detection capability.
    pub fn detector(&self) -> NotesResult<&dyn TextDetector> {
        self.detector
            .as_deref()
            .ok_or(NotesError::ModelUnavailable {
                capability: "detection",
            })
    }

    /// Returns the recognition capability.
    pub fn recognizer(&self) -> NotesResult<&dyn TextRecognizer> {
        self.recognizer
            .as_deref()
            .ok_or(NotesError::ModelUnavailable {
                capability: "recognition",
            })
    }

    /// Returns true when both capabilities are present.
    pub fn is_ready(&self) -> bool {
        self.detector.is_some() && self.recognizer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_handle_reports_missing_capabilities() {
        let models = OcrModels::empty();
        assert!(!models.is_ready());
        assert!(matches!(
            models.detector(),
            Err(NotesError::ModelUnavailable {
                capability: "detection"
            })
        ));
        assert!(matches!(
            models.recognizer(),
            Err(NotesError::ModelUnavailable {
                capability: "recognition"
            })
        ));
    }
}
