//! Post-processing for DB (Differentiable Binarization) text detection models.
//!
//! The [`DBPostProcess`] struct turns a probability map into text-line boxes by
//! thresholding, contour extraction, scoring, and unclipping. Boxes are kept
//! axis-aligned: the Notes block is scanned upright, and the recognizer crops
//! by axis-aligned extent anyway.

use crate::processors::geometry::BoundingBox;
use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use ndarray::ArrayView2;

/// Post-processor for DB text detection models.
#[derive(Debug, Clone)]
pub struct DBPostProcess {
    /// Threshold for binarizing the prediction map (default: 0.3).
    pub thresh: f32,
    /// Threshold for filtering boxes on their mean probability (default: 0.6).
    pub box_thresh: f32,
    /// Maximum number of contours to consider (default: 1000).
    pub max_candidates: usize,
    /// Ratio for unclipping (expanding) boxes (default: 1.5).
    pub unclip_ratio: f32,
    /// Minimum side length for detected boxes, in map pixels.
    pub min_size: f32,
}

impl Default for DBPostProcess {
    fn default() -> Self {
        Self {
            thresh: 0.3,
            box_thresh: 0.6,
            max_candidates: 1000,
            unclip_ratio: 1.5,
            min_size: 3.0,
        }
    }
}

impl DBPostProcess {
    /// Creates a post-processor with the given thresholds.
    pub fn new(thresh: f32, box_thresh: f32, unclip_ratio: f32, max_candidates: usize) -> Self {
        Self {
            thresh,
            box_thresh,
            unclip_ratio,
            max_candidates,
            ..Self::default()
        }
    }

    /// Extracts boxes and their scores from one probability map.
    ///
    /// # Arguments
    ///
    /// * `pred` - Probability map of shape `[height, width]`
    /// * `dest_width` - Width of the image the boxes are reported against
    /// * `dest_height` - Height of the image the boxes are reported against
    ///
    /// # Returns
    ///
    /// Boxes in destination coordinates, paired with their mean probability.
    pub fn process(
        &self,
        pred: &ArrayView2<f32>,
        dest_width: u32,
        dest_height: u32,
    ) -> Vec<(BoundingBox, f32)> {
        let height = pred.shape()[0] as u32;
        let width = pred.shape()[1] as u32;
        if height == 0 || width == 0 {
            return Vec::new();
        }

        tracing::debug!(
            "DBPostProcess: pred {}x{}, dest {}x{}",
            width,
            height,
            dest_width,
            dest_height
        );

        let mut mask = GrayImage::new(width, height);
        for y in 0..height as usize {
            for x in 0..width as usize {
                let value = if pred[[y, x]] > self.thresh { 255 } else { 0 };
                mask.put_pixel(x as u32, y as u32, Luma([value]));
            }
        }

        let width_scale = dest_width as f32 / width as f32;
        let height_scale = dest_height as f32 / height as f32;

        let mut results = Vec::new();
        let outer = find_contours::<u32>(&mask)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer)
            .take(self.max_candidates);

        for contour in outer {
            let rect = BoundingBox::from_contour(&contour);
            let (x0, y0, x1, y1) = (rect.x_min(), rect.y_min(), rect.x_max(), rect.y_max());
            if (x1 - x0).min(y1 - y0) < self.min_size {
                continue;
            }

            let score = Self::box_score(pred, x0, y0, x1, y1);
            if score < self.box_thresh {
                continue;
            }

            let unclipped = self.unclip(x0, y0, x1, y1);
            let side = (unclipped.x_max() - unclipped.x_min()).min(unclipped.y_max() - unclipped.y_min());
            if side < self.min_size + 2.0 {
                continue;
            }

            let scaled = BoundingBox::from_coords(
                (unclipped.x_min() * width_scale).round().clamp(0.0, dest_width as f32),
                (unclipped.y_min() * height_scale).round().clamp(0.0, dest_height as f32),
                (unclipped.x_max() * width_scale).round().clamp(0.0, dest_width as f32),
                (unclipped.y_max() * height_scale).round().clamp(0.0, dest_height as f32),
            );
            results.push((scaled, score));
        }

        results
    }

    /// Mean probability inside the inclusive rectangle.
    fn box_score(pred: &ArrayView2<f32>, x0: f32, y0: f32, x1: f32, y1: f32) -> f32 {
        let h = pred.shape()[0];
        let w = pred.shape()[1];
        let xs = (x0.max(0.0) as usize).min(w - 1);
        let xe = (x1.max(0.0) as usize).min(w - 1);
        let ys = (y0.max(0.0) as usize).min(h - 1);
        let ye = (y1.max(0.0) as usize).min(h - 1);

        let mut sum = 0.0;
        let mut count = 0usize;
        for y in ys..=ye {
            for x in xs..=xe {
                sum += pred[[y, x]];
                count += 1;
            }
        }
        if count == 0 { 0.0 } else { sum / count as f32 }
    }

    /// Expands a rectangle outward by `area * unclip_ratio / perimeter`.
    fn unclip(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> BoundingBox {
        let rect = BoundingBox::from_coords(x0, y0, x1, y1);
        let perimeter = rect.perimeter();
        if perimeter <= f32::EPSILON {
            return rect;
        }
        let distance = rect.area() * self.unclip_ratio / perimeter;
        BoundingBox::from_coords(x0 - distance, y0 - distance, x1 + distance, y1 + distance)
    }
}
