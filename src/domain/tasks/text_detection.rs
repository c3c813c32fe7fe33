//! Text detection capability.
//!
//! A detector finds text-line polygons in an image and scores each one. The
//! notes pipeline only consumes this narrow contract; the concrete model lives
//! in [`crate::domain::adapters`].

use crate::core::errors::NotesResult;
use crate::core::{ConfigError, ConfigValidator};
use crate::processors::{BoundingBox, DBPostProcess};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// A single text detection result with bounding box and confidence score.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// The bounding box polygon coordinates
    pub bbox: BoundingBox,
    /// Confidence score for this detection (0.0 to 1.0)
    pub score: f32,
}

impl Detection {
    /// Creates a new detection.
    pub fn new(bbox: BoundingBox, score: f32) -> Self {
        Self { bbox, score }
    }
}

/// Configuration for the DB text detection model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDetectionConfig {
    /// Score threshold for binarizing the probability map (default: 0.3)
    pub score_threshold: f32,
    /// Lower bound on a box's mean probability (default: 0.5)
    ///
    /// Kept at or below the pipeline's own confidence filter so that filter
    /// sees every candidate it could accept.
    pub box_threshold: f32,
    /// Unclip ratio for expanding detected regions (default: 1.5)
    pub unclip_ratio: f32,
    /// Maximum candidates to consider (default: 1000)
    pub max_candidates: usize,
    /// Longest side after resizing, rounded down to a multiple of 32 (default: 960)
    pub limit_side_len: u32,
}

impl Default for TextDetectionConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.3,
            box_threshold: 0.5,
            unclip_ratio: 1.5,
            max_candidates: 1000,
            limit_side_len: 960,
        }
    }
}

impl ConfigValidator for TextDetectionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_range("score_threshold", self.score_threshold, 0.0, 1.0)?;
        self.validate_range("box_threshold", self.box_threshold, 0.0, 1.0)?;
        if self.unclip_ratio.is_nan() || self.unclip_ratio <= 0.0 {
            return Err(ConfigError::invalid("unclip_ratio", "must be greater than 0"));
        }
        self.validate_positive("max_candidates", self.max_candidates)?;
        if self.limit_side_len < 32 {
            return Err(ConfigError::invalid("limit_side_len", "must be at least 32"));
        }
        Ok(())
    }
}

impl TextDetectionConfig {
    /// Builds the DB post-processor for these thresholds.
    pub fn postprocessor(&self) -> DBPostProcess {
        DBPostProcess::new(
            self.score_threshold,
            self.box_threshold,
            self.unclip_ratio,
            self.max_candidates,
        )
    }
}

/// Finds text-line polygons in images.
///
/// Implementations are shared across extraction calls and must not keep
/// per-call mutable state.
pub trait TextDetector: Send + Sync {
    /// Detects text lines in each image.
    ///
    /// # Arguments
    ///
    /// * `images` - Images to run detection on
    /// * `batch_size` - Maximum number of images per model invocation
    ///
    /// # Returns
    ///
    /// One detection list per input image, in input order.
    fn detect(&self, images: &[RgbImage], batch_size: usize) -> NotesResult<Vec<Vec<Detection>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TextDetectionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_postprocessor_keeps_mid_confidence_lines() {
        let mut pred = ndarray::Array2::<f32>::zeros((40, 80));
        for y in 10..20 {
            for x in 10..60 {
                pred[[y, x]] = 0.55;
            }
        }

        let boxes = TextDetectionConfig::default()
            .postprocessor()
            .process(&pred.view(), 80, 40);
        assert_eq!(boxes.len(), 1);
        assert!((boxes[0].1 - 0.55).abs() < 1e-3);
    }

    #[test]
    fn test_config_rejects_out_of_range_threshold() {
        let config = TextDetectionConfig {
            box_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TextDetectionConfig {
            limit_side_len: 16,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
