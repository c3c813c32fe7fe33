//! Configuration for notes extraction.
//!
//! Every value has a default matching the standard drawing-sheet convention.
//! A JSON file can override any subset, so new layouts and translation rules
//! need no code change.

use crate::core::{ConfigError, ConfigValidator};
use crate::domain::{RecognitionOptions, TextDetectionConfig};
use crate::notes::layout::{NotesLayout, Orientation};
use crate::notes::ocr::OcrParams;
use crate::notes::reconstruct::{
    NotesReconstructor, TranslationRule, default_gap_fill_keywords, default_translation_rules,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the notes extraction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    /// Crop templates per orientation
    pub layout: NotesLayout,
    /// Longest allowed crop side before downscaling (default: 1200)
    pub max_crop_pixels: u32,
    /// Minimum detection confidence (default: 0.5)
    pub min_det_confidence: f32,
    /// Column guard for portrait pages (default: 0.8)
    pub portrait_max_col_frac: Option<f32>,
    /// Column guard for landscape pages (default: none)
    pub landscape_max_col_frac: Option<f32>,
    /// Images per detection call (default: 4)
    pub det_batch_size: usize,
    /// Detection model thresholds
    pub detection: TextDetectionConfig,
    /// Options forwarded to the recognizer
    pub recognition: RecognitionOptions,
    /// Ordered translation attachment table
    pub translation_rules: Vec<TranslationRule>,
    /// Keywords marking lines that lost their item number
    pub gap_fill_keywords: Vec<String>,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            layout: NotesLayout::default(),
            max_crop_pixels: 1200,
            min_det_confidence: 0.5,
            portrait_max_col_frac: Some(0.8),
            landscape_max_col_frac: None,
            det_batch_size: 4,
            detection: TextDetectionConfig::default(),
            recognition: RecognitionOptions::default(),
            translation_rules: default_translation_rules(),
            gap_fill_keywords: default_gap_fill_keywords(),
        }
    }
}

impl NotesConfig {
    /// Loads and validates a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// OCR parameters for a page of the given orientation.
    pub fn ocr_params(&self, orientation: Orientation) -> OcrParams {
        let max_col_frac = match orientation {
            Orientation::Portrait => self.portrait_max_col_frac,
            Orientation::Landscape => self.landscape_max_col_frac,
        };
        OcrParams {
            min_confidence: self.min_det_confidence,
            max_col_frac,
            det_batch_size: self.det_batch_size,
            recognition: self.recognition.clone(),
        }
    }

    /// Builds the text reconstructor from the configured tables.
    pub fn reconstructor(&self) -> NotesReconstructor {
        NotesReconstructor::new(
            self.translation_rules.clone(),
            self.gap_fill_keywords.clone(),
        )
    }
}

impl ConfigValidator for NotesConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.layout.validate()?;
        if self.max_crop_pixels == 0 {
            return Err(ConfigError::invalid("max_crop_pixels", "must be greater than 0"));
        }
        self.validate_range("min_det_confidence", self.min_det_confidence, 0.0, 1.0)?;
        for (field, frac) in [
            ("portrait_max_col_frac", self.portrait_max_col_frac),
            ("landscape_max_col_frac", self.landscape_max_col_frac),
        ] {
            if let Some(frac) = frac {
                if !(frac > 0.0 && frac <= 1.0) {
                    return Err(ConfigError::invalid(
                        field,
                        format!("must be in (0, 1], got {frac}"),
                    ));
                }
            }
        }
        self.validate_positive("det_batch_size", self.det_batch_size)?;
        self.detection.validate()?;
        if self.detection.box_threshold > self.min_det_confidence {
            return Err(ConfigError::invalid(
                "detection.box_threshold",
                format!(
                    "must not exceed min_det_confidence ({}), got {}",
                    self.min_det_confidence, self.detection.box_threshold
                ),
            ));
        }
        self.recognition.validate()?;
        for (i, rule) in self.translation_rules.iter().enumerate() {
            if rule.source.is_empty() || rule.target.is_empty() {
                return Err(ConfigError::invalid(
                    format!("translation_rules[{i}]"),
                    "source and target keyword lists must not be empty",
                ));
            }
        }
        Ok(())
    }
}
