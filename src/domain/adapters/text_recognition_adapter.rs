//! CTC text recognition backed by an ONNX model.
//!
//! Each polygon is cropped by its axis-aligned extent, resized to the model
//! height keeping aspect ratio, and batched by width. Output probabilities
//! are greedily decoded against the character dictionary.

use crate::core::config::OrtSessionConfig;
use crate::core::errors::{NotesError, NotesResult, ProcessingStage};
use crate::core::OrtInfer;
use crate::domain::tasks::{
    RecognitionOptions, RecognitionOutput, RecognitionTask, TextLine, TextRecognizer,
};
use crate::processors::{BoundingBox, CtcLabelDecode, NormalizeImage};
use image::RgbImage;
use image::imageops::{self, FilterType};
use itertools::Itertools;
use ndarray::{Array3, Array4, s};
use std::path::Path;

const DEFAULT_IMAGE_HEIGHT: u32 = 48;
const MIN_LINE_WIDTH: u32 = 16;

/// Text recognizer that runs a CTC model through ONNX Runtime.
#[derive(Debug)]
pub struct OnnxTextRecognizer {
    infer: OrtInfer,
    decoder: CtcLabelDecode,
    normalizer: NormalizeImage,
    image_height: u32,
}

/// A line crop waiting for recognition.
struct LineCrop {
    polygon: BoundingBox,
    image: Option<RgbImage>,
}

impl OnnxTextRecognizer {
    /// Creates a builder with default configuration.
    pub fn builder() -> OnnxTextRecognizerBuilder {
        OnnxTextRecognizerBuilder::new()
    }

    fn prepare_crops(
        &self,
        image: &RgbImage,
        polygons: &[BoundingBox],
        options: &RecognitionOptions,
    ) -> Vec<LineCrop> {
        match options.task {
            RecognitionTask::Ocr => {
                let polygon = BoundingBox::from_coords(
                    0.0,
                    0.0,
                    image.width() as f32,
                    image.height() as f32,
                );
                let image = (image.width() > 0 && image.height() > 0)
                    .then(|| self.resize_line(image, options.max_sliding_window));
                vec![LineCrop { polygon, image }]
            }
            RecognitionTask::OcrWithBoxes => {
                let ordered: Vec<&BoundingBox> = if options.sort_lines {
                    polygons
                        .iter()
                        .sorted_by(|a, b| {
                            a.y_min()
                                .total_cmp(&b.y_min())
                                .then(a.x_min().total_cmp(&b.x_min()))
                        })
                        .collect()
                } else {
                    polygons.iter().collect()
                };

                ordered
                    .into_iter()
                    .map(|polygon| {
                        let image = polygon
                            .clamped_rect(image.width(), image.height())
                            .map(|(x0, y0, x1, y1)| {
                                let crop = imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0)
                                    .to_image();
                                self.resize_line(&crop, options.max_sliding_window)
                            });
                        LineCrop {
                            polygon: polygon.clone(),
                            image,
                        }
                    })
                    .collect()
            }
        }
    }

    /// Resizes a line crop to the model height, keeping aspect ratio.
    fn resize_line(&self, crop: &RgbImage, max_width: usize) -> RgbImage {
        let ratio = crop.width() as f32 / crop.height().max(1) as f32;
        let width = ((self.image_height as f32 * ratio).ceil() as u32)
            .clamp(MIN_LINE_WIDTH, (max_width as u32).max(MIN_LINE_WIDTH));
        imageops::resize(crop, width, self.image_height, FilterType::Triangle)
    }

    /// Recognizes resized line images, returning `(text, confidence)` per line.
    fn recognize_lines(
        &self,
        lines: &[&RgbImage],
        options: &RecognitionOptions,
    ) -> NotesResult<Vec<(String, f32)>> {
        let mut results = vec![(String::new(), 0.0); lines.len()];

        // Similar widths share a batch to limit padding.
        let order: Vec<usize> = (0..lines.len())
            .sorted_by_key(|&i| lines[i].width())
            .collect();

        for chunk in order.chunks(options.batch_size.max(1)) {
            let batch_w = chunk
                .iter()
                .map(|&i| lines[i].width())
                .max()
                .unwrap_or(MIN_LINE_WIDTH) as usize;
            let mut tensor =
                Array4::<f32>::zeros((chunk.len(), 3, self.image_height as usize, batch_w));
            for (b, &i) in chunk.iter().enumerate() {
                self.normalizer.write_into(lines[i], &mut tensor, b, 0.0);
            }

            let (shape, data) = self.infer.infer_4d(&tensor)?;
            let [n, steps, classes] = shape.as_slice() else {
                return Err(NotesError::invalid_input(format!(
                    "model '{}': unexpected recognition output shape {shape:?}",
                    self.infer.model_name()
                )));
            };
            if *classes != self.decoder.num_classes() {
                return Err(NotesError::invalid_field(
                    "character dictionary",
                    format!("{classes} classes to match the model"),
                    format!("{} classes", self.decoder.num_classes()),
                ));
            }
            let probs = Array3::from_shape_vec((*n, *steps, *classes), data).map_err(|e| {
                NotesError::processing(
                    ProcessingStage::TensorOperation,
                    "reshape recognition output",
                    e,
                )
            })?;

            for (b, &i) in chunk.iter().enumerate().take(*n) {
                let row = probs.slice(s![b, .., ..]);
                results[i] = self.decoder.decode(&row, options.max_tokens);
            }
        }

        Ok(results)
    }
}

impl TextRecognizer for OnnxTextRecognizer {
    fn recognize(
        &self,
        images: &[RgbImage],
        polygons: &[Vec<BoundingBox>],
        options: &RecognitionOptions,
    ) -> NotesResult<Vec<RecognitionOutput>> {
        if images.len() != polygons.len() {
            return Err(NotesError::invalid_input(format!(
                "got {} images but {} polygon lists",
                images.len(),
                polygons.len()
            )));
        }

        let mut outputs = Vec::with_capacity(images.len());
        for (image, polys) in images.iter().zip(polygons) {
            let crops = self.prepare_crops(image, polys, options);
            let readable: Vec<&RgbImage> = crops.iter().filter_map(|c| c.image.as_ref()).collect();
            let mut decoded = self.recognize_lines(&readable, options)?.into_iter();

            let mut text_lines: Vec<TextLine> = Vec::with_capacity(crops.len());
            for crop in crops {
                let (text, confidence) = match crop.image {
                    Some(_) => decoded.next().unwrap_or_default(),
                    None => (String::new(), 0.0),
                };
                if options.drop_repeated_text
                    && !text.is_empty()
                    && text_lines.last().is_some_and(|prev| prev.text == text)
                {
                    continue;
                }
                text_lines.push(TextLine {
                    text,
                    confidence,
                    polygon: crop.polygon,
                });
            }

            tracing::debug!(
                task = options.task.as_str(),
                lines = text_lines.len(),
                "text recognition complete"
            );
            outputs.push(RecognitionOutput { text_lines });
        }
        Ok(outputs)
    }
}

/// Builder for [`OnnxTextRecognizer`].
#[derive(Debug)]
pub struct OnnxTextRecognizerBuilder {
    image_height: u32,
    ort_config: Option<OrtSessionConfig>,
}

impl Default for OnnxTextRecognizerBuilder {
    fn default() -> Self {
        Self {
            image_height: DEFAULT_IMAGE_HEIGHT,
            ort_config: None,
        }
    }
}

impl OnnxTextRecognizerBuilder {
    /// Creates a new text recognition builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model input height.
    pub fn image_height(mut self, height: u32) -> Self {
        self.image_height = height;
        self
    }

    /// Sets the ONNX Runtime session configuration.
    pub fn with_ort_config(mut self, config: OrtSessionConfig) -> Self {
        self.ort_config = Some(config);
        self
    }

    /// Loads the model and character dictionary and builds the recognizer.
    pub fn build(self, model_path: &Path, dict_path: &Path) -> NotesResult<OnnxTextRecognizer> {
        if self.image_height == 0 {
            return Err(NotesError::invalid_field("image_height", "a positive height", "0"));
        }
        let dict = std::fs::read_to_string(dict_path).map_err(|e| {
            NotesError::processing(
                ProcessingStage::Generic,
                format!("read character dictionary '{}'", dict_path.display()),
                e,
            )
        })?;
        let decoder = CtcLabelDecode::from_dict_str(&dict);
        let infer = OrtInfer::from_file(model_path, "text_recognition", self.ort_config.as_ref())?;
        tracing::info!(
            model = %model_path.display(),
            classes = decoder.num_classes(),
            "text recognition model loaded"
        );

        Ok(OnnxTextRecognizer {
            infer,
            decoder,
            normalizer: NormalizeImage::for_ocr_recognition(),
            image_height: self.image_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_build_fails_for_missing_dictionary() {
        let err = OnnxTextRecognizer::builder()
            .build(Path::new("/nonexistent/rec.onnx"), Path::new("/nonexistent/dict.txt"))
            .unwrap_err();
        assert!(matches!(err, NotesError::Processing { .. }));
    }

    #[test]
    fn test_build_fails_for_missing_model() {
        let mut dict = tempfile::NamedTempFile::new().unwrap();
        writeln!(dict, "a\nb").unwrap();
        let err = OnnxTextRecognizer::builder()
            .build(Path::new("/nonexistent/rec.onnx"), dict.path())
            .unwrap_err();
        assert!(matches!(err, NotesError::ModelLoad { .. }));
    }

    #[test]
    fn test_zero_height_is_rejected() {
        let err = OnnxTextRecognizer::builder()
            .image_height(0)
            .build(Path::new("rec.onnx"), Path::new("dict.txt"))
            .unwrap_err();
        assert!(matches!(err, NotesError::ConfigError { .. }));
    }
}
