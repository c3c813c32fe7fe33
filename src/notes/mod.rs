//! The notes extraction pipeline.
//!
//! Stages, leaf first:
//!
//! - [`render`] - page rasterization
//! - [`layout`] - orientation and crop templates
//! - [`crop`] - region cropping and size limiting
//! - [`ocr`] - direct detection and recognition over the crop
//! - [`reconstruct`] - rebuilding the numbered Notes block
//! - [`extractor`] - sequencing the stages into an [`ExtractionResult`]

pub mod config;
pub mod crop;
pub mod extractor;
pub mod layout;
pub mod ocr;
pub mod reconstruct;
pub mod render;
pub mod result;

pub use config::NotesConfig;
pub use crop::{CropRegion, crop_region, limit_size};
pub use extractor::{DEFAULT_DPI, ExtractOptions, NotesExtractor, extract_notes};
pub use layout::{CropTemplate, NotesLayout, Orientation};
pub use ocr::{OcrParams, filter_and_sort, ocr_crop};
pub use reconstruct::{NOTES_HEADER, NotesReconstructor, TranslationRule, reconstruct_notes};
pub use render::{PageRasterizer, PdfiumRasterizer};
pub use result::ExtractionResult;
