//! The extraction orchestrator.
//!
//! One call renders a page, picks the crop template by orientation, crops
//! and size-limits the Notes region, encodes the preview, runs OCR, and
//! reconstructs the text. Every failure is converted into a failure-shaped
//! [`ExtractionResult`]; the preview is encoded before OCR so it survives an
//! OCR failure.

use crate::core::errors::{NotesError, NotesResult};
use crate::core::ConfigValidator;
use crate::domain::OcrModels;
use crate::notes::config::NotesConfig;
use crate::notes::crop::{crop_region, limit_size};
use crate::notes::layout::Orientation;
use crate::notes::ocr::ocr_crop;
use crate::notes::reconstruct::NotesReconstructor;
use crate::notes::render::{PageRasterizer, PdfiumRasterizer};
use crate::notes::result::ExtractionResult;
use crate::utils::encode_png_base64;
use std::path::Path;
use std::sync::Arc;

/// Default render resolution.
pub const DEFAULT_DPI: u32 = 150;

/// Per-call extraction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Zero-based page to read the Notes block from
    pub page_index: usize,
    /// Render resolution in dots per inch
    pub dpi: u32,
    /// Whether to return a base64 PNG of the crop
    pub include_preview: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            page_index: 0,
            dpi: DEFAULT_DPI,
            include_preview: true,
        }
    }
}

/// Extracts the Notes block from drawing sheets.
///
/// Holds only shared, read-only state and can serve concurrent calls.
#[derive(Clone)]
pub struct NotesExtractor {
    rasterizer: Arc<dyn PageRasterizer>,
    models: OcrModels,
    config: NotesConfig,
    reconstructor: NotesReconstructor,
}

impl std::fmt::Debug for NotesExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotesExtractor")
            .field("models", &self.models)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NotesExtractor {
    /// Creates an extractor after validating `config`.
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        models: OcrModels,
        config: NotesConfig,
    ) -> NotesResult<Self> {
        config.validate()?;
        let reconstructor = config.reconstructor();
        Ok(Self {
            rasterizer,
            models,
            config,
            reconstructor,
        })
    }

    /// Creates an extractor using PDFium for rendering.
    pub fn with_pdfium(models: OcrModels, config: NotesConfig) -> NotesResult<Self> {
        Self::new(Arc::new(PdfiumRasterizer::new()?), models, config)
    }

    /// Returns the capability handle.
    pub fn models(&self) -> &OcrModels {
        &self.models
    }

    /// Returns the extraction configuration.
    pub fn config(&self) -> &NotesConfig {
        &self.config
    }

    /// Extracts the Notes block from one page of `path`.
    pub fn extract(&self, path: &Path, options: &ExtractOptions) -> ExtractionResult {
        let page = match self
            .rasterizer
            .render(path, options.page_index, options.dpi)
        {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(path = %path.display(), page = options.page_index, error = %err, "page render failed");
                return ExtractionResult::failure(format!(
                    "Failed to render page {}: {}",
                    options.page_index,
                    render_detail(&err)
                ));
            }
        };

        let orientation = Orientation::classify(page.width(), page.height());
        let template = self.config.layout.template_for(orientation);
        tracing::info!(
            width = page.width(),
            height = page.height(),
            dpi = options.dpi,
            %orientation,
            "page rendered"
        );

        let region = match crop_region(&page, template) {
            Ok(region) => region,
            Err(err) => return ExtractionResult::failure(format!("Failed to crop notes region: {err}")),
        };
        drop(page);

        let bbox = region.bbox;
        let crop = limit_size(region.image, self.config.max_crop_pixels);
        tracing::debug!(
            ?bbox,
            width = crop.width(),
            height = crop.height(),
            "notes region cropped"
        );

        let preview = if options.include_preview {
            match encode_png_base64(&crop) {
                Ok(encoded) => Some(encoded),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to encode crop preview");
                    None
                }
            }
        } else {
            None
        };

        let params = self.config.ocr_params(orientation);
        let lines = match ocr_crop(&crop, &self.models, &params) {
            Ok(lines) => lines,
            Err(err) => {
                tracing::warn!(error = %err, "notes OCR failed");
                return ExtractionResult::failure_with_artifacts(
                    format!("OCR failed: {err}"),
                    bbox,
                    orientation,
                    preview,
                );
            }
        };

        let notes = self.reconstructor.reconstruct(&lines);
        let notes_text = notes.join("\n");
        tracing::info!(
            raw_lines = lines.len(),
            notes_lines = notes.len(),
            chars = notes_text.chars().count(),
            "notes extracted"
        );
        ExtractionResult::success(notes_text, bbox, orientation, preview)
    }
}

/// Extracts the Notes block with the default configuration and PDFium rendering.
///
/// A rasterizer that cannot be initialized is reported as a render failure.
pub fn extract_notes(path: &Path, models: &OcrModels, options: &ExtractOptions) -> ExtractionResult {
    match NotesExtractor::with_pdfium(models.clone(), NotesConfig::default()) {
        Ok(extractor) => extractor.extract(path, options),
        Err(err) => ExtractionResult::failure(format!(
            "Failed to render page {}: {}",
            options.page_index,
            render_detail(&err)
        )),
    }
}

fn render_detail(err: &NotesError) -> String {
    match err {
        NotesError::Render { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Detection, RecognitionOptions, RecognitionOutput, TextDetector, TextLine, TextRecognizer,
    };
    use crate::processors::BoundingBox;
    use image::RgbImage;
    use std::sync::Mutex;

    struct FakeRasterizer {
        width: u32,
        height: u32,
        pages: usize,
    }

    impl PageRasterizer for FakeRasterizer {
        fn render(&self, _path: &Path, page_index: usize, _dpi: u32) -> NotesResult<RgbImage> {
            if page_index >= self.pages {
                return Err(NotesError::render(page_index, "page index out of range"));
            }
            Ok(RgbImage::new(self.width, self.height))
        }
    }

    /// Reports one box per entry, in the given (unsorted) order.
    struct FakeDetector(Vec<Detection>);

    impl TextDetector for FakeDetector {
        fn detect(&self, images: &[RgbImage], _batch_size: usize) -> NotesResult<Vec<Vec<Detection>>> {
            Ok(images.iter().map(|_| self.0.clone()).collect())
        }
    }

    /// Reads the text registered for each polygon's top edge.
    #[derive(Default)]
    struct FakeRecognizer {
        texts: Vec<(f32, &'static str)>,
        seen_crop: Mutex<Option<(u32, u32)>>,
    }

    impl TextRecognizer for FakeRecognizer {
        fn recognize(
            &self,
            images: &[RgbImage],
            polygons: &[Vec<BoundingBox>],
            _options: &RecognitionOptions,
        ) -> NotesResult<Vec<RecognitionOutput>> {
            *self.seen_crop.lock().unwrap() = Some(images[0].dimensions());
            Ok(polygons
                .iter()
                .map(|polys| RecognitionOutput {
                    text_lines: polys
                        .iter()
                        .map(|p| TextLine {
                            text: self
                                .texts
                                .iter()
                                .find(|(top, _)| *top == p.y_min())
                                .map(|(_, t)| t.to_string())
                                .unwrap_or_default(),
                            confidence: 0.9,
                            polygon: p.clone(),
                        })
                        .collect(),
                })
                .collect())
        }
    }

    fn line(top: f32, x0: f32, x1: f32) -> Detection {
        Detection::new(BoundingBox::from_coords(x0, top, x1, top + 8.0), 0.9)
    }

    fn extractor(
        width: u32,
        height: u32,
        models: OcrModels,
    ) -> NotesExtractor {
        let rasterizer = Arc::new(FakeRasterizer {
            width,
            height,
            pages: 1,
        });
        NotesExtractor::new(rasterizer, models, NotesConfig::default()).unwrap()
    }

    fn drawing_models() -> (OcrModels, Arc<FakeRecognizer>) {
        let detector = FakeDetector(vec![
            line(40.0, 0.0, 100.0),
            line(10.0, 0.0, 50.0),
            line(25.0, 0.0, 100.0),
            line(55.0, 0.0, 100.0),
            line(70.0, 0.0, 100.0),
        ]);
        let recognizer = Arc::new(FakeRecognizer {
            texts: vec![
                (10.0, "Notes:"),
                (25.0, "1. Material: Steel"),
                (40.0, "(材質)"),
                (55.0, "Drawing NO. 12345"),
                (70.0, "2. Hardness: HRC40"),
            ],
            ..Default::default()
        });
        (
            OcrModels::new(Arc::new(detector), recognizer.clone()),
            recognizer,
        )
    }

    #[test]
    fn test_landscape_extraction() {
        let (models, _) = drawing_models();
        let result = extractor(1000, 700, models).extract(Path::new("sheet.pdf"), &ExtractOptions::default());

        assert!(result.success);
        assert_eq!(result.error, None);
        assert_eq!(result.orientation, Some(Orientation::Landscape));
        assert_eq!(result.crop_bbox, Some([620, 63, 920, 371]));
        assert_eq!(
            result.notes_text.as_deref(),
            Some("Notes:\n1. Material: Steel\n(材質)\n2. Hardness: HRC40")
        );
        assert!(result.preview_image.is_some());
    }

    #[test]
    fn test_render_failure_has_no_artifacts() {
        let (models, _) = drawing_models();
        let options = ExtractOptions {
            page_index: 3,
            ..Default::default()
        };
        let result = extractor(1000, 700, models).extract(Path::new("sheet.pdf"), &options);

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Failed to render page 3: page index out of range")
        );
        assert_eq!(result.crop_bbox, None);
        assert_eq!(result.orientation, None);
        assert_eq!(result.preview_image, None);
    }

    #[test]
    fn test_ocr_failure_keeps_preview() {
        let result = extractor(700, 1000, OcrModels::empty())
            .extract(Path::new("sheet.pdf"), &ExtractOptions::default());

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().starts_with("OCR failed: detection capability"));
        assert_eq!(result.orientation, Some(Orientation::Portrait));
        assert_eq!(result.crop_bbox, Some([84, 50, 385, 440]));
        assert!(result.preview_image.is_some());
        assert_eq!(result.notes_text, None);
    }

    #[test]
    fn test_preview_can_be_disabled() {
        let (models, _) = drawing_models();
        let options = ExtractOptions {
            include_preview: false,
            ..Default::default()
        };
        let result = extractor(1000, 700, models).extract(Path::new("sheet.pdf"), &options);
        assert!(result.success);
        assert_eq!(result.preview_image, None);
    }

    #[test]
    fn test_portrait_column_guard() {
        let detector = FakeDetector(vec![
            line(10.0, 0.0, 100.0),
            line(20.0, 300.0, 340.0),
        ]);
        let recognizer = Arc::new(FakeRecognizer {
            texts: vec![(10.0, "1. Material: Steel"), (20.0, "TOLERANCE TABLE")],
            ..Default::default()
        });
        let models = OcrModels::new(Arc::new(detector), recognizer);

        // Portrait crop is 301 px wide; the second box is centred at x=320.
        let result = extractor(700, 1000, models.clone())
            .extract(Path::new("sheet.pdf"), &ExtractOptions::default());
        assert_eq!(result.notes_text.as_deref(), Some("1. Material: Steel"));

        // Landscape pages have no guard.
        let result = extractor(1000, 700, models).extract(Path::new("sheet.pdf"), &ExtractOptions::default());
        assert_eq!(
            result.notes_text.as_deref(),
            Some("1. Material: Steel\nTOLERANCE TABLE")
        );
    }

    #[test]
    fn test_large_crop_is_downscaled_before_ocr() {
        let (models, recognizer) = drawing_models();
        let result = extractor(4000, 3000, models).extract(Path::new("sheet.pdf"), &ExtractOptions::default());

        assert!(result.success);
        assert_eq!(result.crop_bbox, Some([2480, 270, 3680, 1590]));
        let (w, h) = recognizer.seen_crop.lock().unwrap().unwrap();
        assert!(w <= 1200 && h <= 1200);
        assert_eq!(h, 1200);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = NotesConfig {
            max_crop_pixels: 0,
            ..Default::default()
        };
        let rasterizer = Arc::new(FakeRasterizer {
            width: 10,
            height: 10,
            pages: 1,
        });
        assert!(NotesExtractor::new(rasterizer, OcrModels::empty(), config).is_err());
    }
}
