//! DB text detection backed by an ONNX model.
//!
//! Images are resized so the long side fits `limit_side_len` with both sides
//! rounded to multiples of 32, normalized with ImageNet statistics, and run
//! through the model in padded batches. Each probability map is cropped back
//! to its image's resized extent before post-processing.

use crate::core::config::OrtSessionConfig;
use crate::core::errors::{NotesError, NotesResult};
use crate::core::{ConfigValidator, OrtInfer};
use crate::domain::tasks::{Detection, TextDetectionConfig, TextDetector};
use crate::processors::{DBPostProcess, NormalizeImage};
use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::{Array4, s};
use std::path::Path;

/// Text detector that runs a DB model through ONNX Runtime.
#[derive(Debug)]
pub struct OnnxTextDetector {
    infer: OrtInfer,
    config: TextDetectionConfig,
    normalizer: NormalizeImage,
    postprocess: DBPostProcess,
}

impl OnnxTextDetector {
    /// Creates a builder with default configuration.
    pub fn builder() -> OnnxTextDetectorBuilder {
        OnnxTextDetectorBuilder::new()
    }

    /// Returns the detection configuration.
    pub fn config(&self) -> &TextDetectionConfig {
        &self.config
    }

    fn run_batch(&self, images: &[&RgbImage]) -> NotesResult<Vec<Vec<Detection>>> {
        let resized: Vec<RgbImage> = images
            .iter()
            .map(|img| {
                let (w, h) = resize_dims(img.width(), img.height(), self.config.limit_side_len);
                imageops::resize(*img, w, h, FilterType::Triangle)
            })
            .collect();

        let batch_h = resized.iter().map(|i| i.height()).max().unwrap_or(32) as usize;
        let batch_w = resized.iter().map(|i| i.width()).max().unwrap_or(32) as usize;
        let mut tensor = Array4::<f32>::zeros((resized.len(), 3, batch_h, batch_w));
        for (i, img) in resized.iter().enumerate() {
            self.normalizer.write_into(img, &mut tensor, i, 0.0);
        }

        let (shape, data) = self.infer.infer_4d(&tensor)?;
        let maps = match shape.as_slice() {
            [n, 1, h, w] | [n, h, w] if *n == resized.len() => {
                Array4::from_shape_vec((*n, 1, *h, *w), data)?
            }
            _ => {
                return Err(NotesError::invalid_input(format!(
                    "model '{}': unexpected detection output shape {shape:?}",
                    self.infer.model_name()
                )));
            }
        };

        let map_h = maps.shape()[2];
        let map_w = maps.shape()[3];
        let mut results = Vec::with_capacity(images.len());
        for (i, (original, scaled)) in images.iter().zip(resized.iter()).enumerate() {
            let h = (scaled.height() as usize).min(map_h);
            let w = (scaled.width() as usize).min(map_w);
            let pred = maps.slice(s![i, 0, ..h, ..w]);
            let detections = self
                .postprocess
                .process(&pred, original.width(), original.height())
                .into_iter()
                .map(|(bbox, score)| Detection::new(bbox, score))
                .collect::<Vec<_>>();
            tracing::debug!(
                image = i,
                width = original.width(),
                height = original.height(),
                boxes = detections.len(),
                "text detection complete"
            );
            results.push(detections);
        }
        Ok(results)
    }
}

impl TextDetector for OnnxTextDetector {
    fn detect(&self, images: &[RgbImage], batch_size: usize) -> NotesResult<Vec<Vec<Detection>>> {
        let mut results = vec![Vec::new(); images.len()];

        // Zero-sized images have nothing to detect and cannot be resized.
        let indices: Vec<usize> = (0..images.len())
            .filter(|&i| images[i].width() > 0 && images[i].height() > 0)
            .collect();

        for chunk in indices.chunks(batch_size.max(1)) {
            let batch: Vec<&RgbImage> = chunk.iter().map(|&i| &images[i]).collect();
            let detections = self.run_batch(&batch)?;
            for (&i, dets) in chunk.iter().zip(detections) {
                results[i] = dets;
            }
        }
        Ok(results)
    }
}

/// Computes resized dimensions: long side at most `limit`, both multiples of 32.
fn resize_dims(width: u32, height: u32, limit: u32) -> (u32, u32) {
    let long_side = width.max(height) as f32;
    let ratio = if long_side > limit as f32 {
        limit as f32 / long_side
    } else {
        1.0
    };
    let round32 = |v: f32| (((v / 32.0).round() as u32) * 32).max(32);
    (round32(width as f32 * ratio), round32(height as f32 * ratio))
}

/// Builder for [`OnnxTextDetector`].
#[derive(Debug, Default)]
pub struct OnnxTextDetectorBuilder {
    config: TextDetectionConfig,
    ort_config: Option<OrtSessionConfig>,
}

impl OnnxTextDetectorBuilder {
    /// Creates a new text detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the detection configuration.
    pub fn with_config(mut self, config: TextDetectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the ONNX Runtime session configuration.
    pub fn with_ort_config(mut self, config: OrtSessionConfig) -> Self {
        self.ort_config = Some(config);
        self
    }

    /// Loads the model and builds the detector.
    pub fn build(self, model_path: &Path) -> NotesResult<OnnxTextDetector> {
        self.config.validate()?;
        let infer = OrtInfer::from_file(model_path, "text_detection", self.ort_config.as_ref())?;
        let postprocess = self.config.postprocessor();
        tracing::info!(model = %model_path.display(), "text detection model loaded");

        Ok(OnnxTextDetector {
            infer,
            config: self.config,
            normalizer: NormalizeImage::imagenet(),
            postprocess,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_dims_limits_long_side() {
        assert_eq!(resize_dims(1920, 960, 960), (960, 480));
        assert_eq!(resize_dims(1200, 500, 960), (960, 416));
    }

    #[test]
    fn test_resize_dims_rounds_small_images() {
        assert_eq!(resize_dims(100, 50, 960), (96, 64));
        assert_eq!(resize_dims(5, 5, 960), (32, 32));
    }

    #[test]
    fn test_build_fails_for_missing_model() {
        let err = OnnxTextDetector::builder()
            .build(Path::new("/nonexistent/det.onnx"))
            .unwrap_err();
        assert!(matches!(err, NotesError::ModelLoad { .. }));
    }
}
