//! The result returned for every extraction call.

use crate::notes::layout::Orientation;
use serde::{Deserialize, Serialize};

/// Outcome of one extraction call.
///
/// `success == false` always comes with an `error`. Artifacts produced before
/// the failure (crop box, orientation, preview) are kept for diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Whether text was extracted
    pub success: bool,
    /// Reconstructed Notes block, one line per `\n`
    pub notes_text: Option<String>,
    /// Crop rectangle `[x0, y0, x1, y1]` in page pixels at the render DPI
    pub crop_bbox: Option<[u32; 4]>,
    /// Page orientation that selected the crop template
    pub orientation: Option<Orientation>,
    /// Failure description
    pub error: Option<String>,
    /// Base64 PNG of the crop
    #[serde(rename = "crop_image_b64")]
    pub preview_image: Option<String>,
}

impl ExtractionResult {
    /// Creates a successful result.
    pub fn success(
        notes_text: String,
        crop_bbox: [u32; 4],
        orientation: Orientation,
        preview_image: Option<String>,
    ) -> Self {
        Self {
            success: true,
            notes_text: Some(notes_text),
            crop_bbox: Some(crop_bbox),
            orientation: Some(orientation),
            error: None,
            preview_image,
        }
    }

    /// Creates a failure result with no artifacts.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            notes_text: None,
            crop_bbox: None,
            orientation: None,
            error: Some(error.into()),
            preview_image: None,
        }
    }

    /// Creates a failure result that keeps the artifacts built so far.
    pub fn failure_with_artifacts(
        error: impl Into<String>,
        crop_bbox: [u32; 4],
        orientation: Orientation,
        preview_image: Option<String>,
    ) -> Self {
        Self {
            crop_bbox: Some(crop_bbox),
            orientation: Some(orientation),
            preview_image,
            ..Self::failure(error)
        }
    }

    /// Returns the reconstructed lines, if any.
    pub fn lines(&self) -> Vec<&str> {
        self.notes_text
            .as_deref()
            .map(|text| text.lines().collect())
            .unwrap_or_default()
    }
}
