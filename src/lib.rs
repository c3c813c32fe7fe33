//! # notes-ocr
//!
//! Extracts the "Notes" block from scanned engineering drawings.
//!
//! General document OCR tends to classify the Notes block on a drawing sheet
//! as a figure and skip it. This crate locates the block geometrically from
//! the sheet orientation, runs text detection and recognition directly on the
//! crop, and rebuilds the noisy lines into a numbered list with bilingual
//! annotations attached to their items.
//!
//! ## Modules
//!
//! * [`core`] - errors, configuration, and the ONNX Runtime session wrapper
//! * [`processors`] - geometry, normalization, DB and CTC post-processing
//! * [`domain`] - detection and recognition capabilities
//! * [`notes`] - the extraction pipeline
//! * [`utils`] - image helpers and logging setup
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use notes_ocr::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NotesConfig::default();
//! let models = OcrModels::from_paths(
//!     Path::new("models/det.onnx"),
//!     Path::new("models/rec.onnx"),
//!     Path::new("models/dict.txt"),
//!     config.detection.clone(),
//!     None,
//! )?;
//! let extractor = NotesExtractor::with_pdfium(models, config)?;
//! let result = extractor.extract(Path::new("drawing.pdf"), &ExtractOptions::default());
//! if let Some(text) = &result.notes_text {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod notes;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{NotesError, NotesResult, OrtSessionConfig};
    pub use crate::domain::{OcrModels, RecognitionOptions, TextDetector, TextRecognizer};
    pub use crate::notes::{
        ExtractOptions, ExtractionResult, NotesConfig, NotesExtractor, Orientation,
        PageRasterizer, extract_notes,
    };
    pub use crate::utils::init_tracing;
}
