//! Direct detection + recognition over the Notes crop.
//!
//! The crop goes straight to the text detector and recognizer. Layout
//! analysis is deliberately not involved: on drawing sheets it labels the
//! Notes block a figure and skips it.

use crate::core::errors::NotesResult;
use crate::domain::{Detection, OcrModels, RecognitionOptions, RecognitionTask};
use crate::processors::BoundingBox;
use image::RgbImage;

/// Parameters for one OCR pass over a crop.
#[derive(Debug, Clone)]
pub struct OcrParams {
    /// Detections scoring below this are dropped
    pub min_confidence: f32,
    /// Drop detections whose horizontal centroid lies right of this fraction of the crop width
    pub max_col_frac: Option<f32>,
    /// Images per detection call
    pub det_batch_size: usize,
    /// Options forwarded to the recognizer
    pub recognition: RecognitionOptions,
}

impl Default for OcrParams {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            max_col_frac: None,
            det_batch_size: 4,
            recognition: RecognitionOptions::default(),
        }
    }
}

/// Filters detections and orders the survivors for reading.
///
/// Drops detections below `min_confidence`, then (when `max_col_frac` is set)
/// those whose vertex centroid lies right of `max_col_frac * crop_width`.
/// Survivors are truncated to integer pixels and sorted by top edge, then
/// left edge.
pub fn filter_and_sort(
    detections: &[Detection],
    min_confidence: f32,
    max_col_frac: Option<f32>,
    crop_width: u32,
) -> Vec<BoundingBox> {
    let column_limit = max_col_frac.map(|frac| frac * crop_width as f32);
    let mut dropped_by_column = 0usize;

    let mut kept: Vec<BoundingBox> = detections
        .iter()
        .filter(|d| d.score >= min_confidence)
        .filter(|d| match column_limit {
            Some(limit) if d.bbox.center().x > limit => {
                dropped_by_column += 1;
                false
            }
            _ => true,
        })
        .map(|d| d.bbox.truncated())
        .collect();

    kept.sort_by(|a, b| {
        a.y_min()
            .total_cmp(&b.y_min())
            .then(a.x_min().total_cmp(&b.x_min()))
    });

    tracing::debug!(
        detected = detections.len(),
        kept = kept.len(),
        dropped_by_column,
        min_confidence,
        "filtered text detections"
    );
    kept
}

/// Runs detection and recognition over `crop`.
///
/// # Returns
///
/// Recognized lines in reading order, trimmed, with blank lines dropped.
///
/// # Errors
///
/// Returns [`crate::core::NotesError::ModelUnavailable`] when either
/// capability is missing, or the capability's own error.
pub fn ocr_crop(crop: &RgbImage, models: &OcrModels, params: &OcrParams) -> NotesResult<Vec<String>> {
    let detector = models.detector()?;
    let recognizer = models.recognizer()?;

    let images = std::slice::from_ref(crop);
    let detections = detector
        .detect(images, params.det_batch_size)?
        .into_iter()
        .next()
        .unwrap_or_default();

    let polygons = filter_and_sort(
        &detections,
        params.min_confidence,
        params.max_col_frac,
        crop.width(),
    );
    if polygons.is_empty() {
        return Ok(Vec::new());
    }

    let mut recognition = params.recognition.clone();
    // The filtered polygons and their reading order must reach the recognizer as-is.
    recognition.task = RecognitionTask::OcrWithBoxes;
    recognition.sort_lines = false;

    let outputs = recognizer.recognize(images, &[polygons], &recognition)?;
    let lines = outputs
        .into_iter()
        .next()
        .map(|output| {
            output
                .text_lines
                .into_iter()
                .map(|line| line.text.trim().to_string())
                .filter(|text| !text.is_empty())
                .collect()
        })
        .unwrap_or_default();
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::NotesError;
    use crate::domain::{RecognitionOutput, TextDetector, TextLine, TextRecognizer};
    use std::sync::{Arc, Mutex};

    fn det(x0: f32, y0: f32, x1: f32, y1: f32, score: f32) -> Detection {
        Detection::new(BoundingBox::from_coords(x0, y0, x1, y1), score)
    }

    struct FixedDetector(Vec<Detection>);

    impl TextDetector for FixedDetector {
        fn detect(&self, images: &[RgbImage], _batch_size: usize) -> NotesResult<Vec<Vec<Detection>>> {
            Ok(images.iter().map(|_| self.0.clone()).collect())
        }
    }

    /// Reads each polygon as "line@<top>" and records the options it saw.
    #[derive(Default)]
    struct EchoRecognizer {
        seen_sort_lines: Mutex<Option<bool>>,
        seen_task: Mutex<Option<RecognitionTask>>,
    }

    impl TextRecognizer for EchoRecognizer {
        fn recognize(
            &self,
            _images: &[RgbImage],
            polygons: &[Vec<BoundingBox>],
            options: &RecognitionOptions,
        ) -> NotesResult<Vec<RecognitionOutput>> {
            *self.seen_sort_lines.lock().unwrap() = Some(options.sort_lines);
            *self.seen_task.lock().unwrap() = Some(options.task);
            Ok(polygons
                .iter()
                .map(|polys| RecognitionOutput {
                    text_lines: polys
                        .iter()
                        .map(|p| TextLine {
                            text: if p.y_min() == 99.0 {
                                "   ".to_string()
                            } else {
                                format!(" line@{} ", p.y_min())
                            },
                            confidence: 0.9,
                            polygon: p.clone(),
                        })
                        .collect(),
                })
                .collect())
        }
    }

    #[test]
    fn test_sort_by_top_then_left() {
        let detections = vec![
            det(0.0, 50.0, 10.0, 60.0, 0.9),
            det(20.0, 10.0, 30.0, 20.0, 0.9),
            det(0.0, 30.0, 10.0, 40.0, 0.9),
            det(5.0, 10.0, 15.0, 20.0, 0.9),
        ];
        let kept = filter_and_sort(&detections, 0.5, None, 100);
        let tops: Vec<f32> = kept.iter().map(|b| b.y_min()).collect();
        assert_eq!(tops, vec![10.0, 10.0, 30.0, 50.0]);
        assert_eq!(kept[0].x_min(), 5.0);
        assert_eq!(kept[1].x_min(), 20.0);
    }

    #[test]
    fn test_confidence_filter_is_monotonic() {
        let detections: Vec<Detection> = (0..10)
            .map(|i| det(0.0, i as f32 * 10.0, 10.0, i as f32 * 10.0 + 5.0, i as f32 / 10.0))
            .collect();

        let mut previous = usize::MAX;
        for threshold in [0.0, 0.25, 0.5, 0.55, 0.9, 1.0] {
            let kept = filter_and_sort(&detections, threshold, None, 100).len();
            assert!(kept <= previous);
            previous = kept;
        }
        assert_eq!(filter_and_sort(&detections, 0.5, None, 100).len(), 5);
    }

    #[test]
    fn test_column_guard_drops_right_side() {
        let detections = vec![
            det(0.0, 0.0, 60.0, 10.0, 0.9),   // centroid 30
            det(70.0, 20.0, 100.0, 30.0, 0.9), // centroid 85
            det(58.0, 40.0, 100.0, 50.0, 0.9), // centroid 79
        ];
        let kept = filter_and_sort(&detections, 0.5, Some(0.8), 100);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].y_min(), 40.0);

        assert_eq!(filter_and_sort(&detections, 0.5, None, 100).len(), 3);
    }

    #[test]
    fn test_polygons_are_truncated() {
        let detections = vec![det(1.7, 2.9, 10.2, 12.8, 0.9)];
        let kept = filter_and_sort(&detections, 0.5, None, 100);
        assert_eq!(kept[0], BoundingBox::from_coords(1.0, 2.0, 10.0, 12.0));
    }

    #[test]
    fn test_ocr_crop_orders_lines_and_drops_blanks() {
        let detector = FixedDetector(vec![
            det(0.0, 50.0, 10.0, 60.0, 0.9),
            det(0.0, 10.0, 10.0, 20.0, 0.9),
            det(0.0, 99.0, 10.0, 109.0, 0.9),
            det(0.0, 30.0, 10.0, 40.0, 0.2),
        ]);
        let recognizer = Arc::new(EchoRecognizer::default());
        let models = OcrModels::new(Arc::new(detector), recognizer.clone());
        let params = OcrParams {
            recognition: RecognitionOptions {
                sort_lines: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let lines = ocr_crop(&RgbImage::new(100, 120), &models, &params).unwrap();
        assert_eq!(lines, vec!["line@10", "line@50"]);
        assert_eq!(*recognizer.seen_sort_lines.lock().unwrap(), Some(false));
    }

    #[test]
    fn test_ocr_crop_always_recognizes_provided_boxes() {
        let detector = FixedDetector(vec![det(0.0, 10.0, 10.0, 20.0, 0.9)]);
        let recognizer = Arc::new(EchoRecognizer::default());
        let models = OcrModels::new(Arc::new(detector), recognizer.clone());
        let params = OcrParams {
            recognition: RecognitionOptions {
                task: RecognitionTask::Ocr,
                ..Default::default()
            },
            ..Default::default()
        };

        let lines = ocr_crop(&RgbImage::new(100, 120), &models, &params).unwrap();
        assert_eq!(lines, vec!["line@10"]);
        assert_eq!(
            *recognizer.seen_task.lock().unwrap(),
            Some(RecognitionTask::OcrWithBoxes)
        );
    }

    #[test]
    fn test_ocr_crop_without_detections_skips_recognition() {
        let recognizer = Arc::new(EchoRecognizer::default());
        let models = OcrModels::new(Arc::new(FixedDetector(Vec::new())), recognizer.clone());

        let lines = ocr_crop(&RgbImage::new(10, 10), &models, &OcrParams::default()).unwrap();
        assert!(lines.is_empty());
        assert_eq!(*recognizer.seen_sort_lines.lock().unwrap(), None);
    }

    #[test]
    fn test_ocr_crop_requires_both_capabilities() {
        let models = OcrModels::empty().with_detector(Arc::new(FixedDetector(Vec::new())));
        let err = ocr_crop(&RgbImage::new(10, 10), &models, &OcrParams::default()).unwrap_err();
        assert!(matches!(
            err,
            NotesError::ModelUnavailable {
                capability: "recognition"
            }
        ));
    }
}
