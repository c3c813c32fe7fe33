//! Utility functions for the notes pipeline.
//!
//! This module provides image loading and encoding helpers, document type
//! sniffing, and logging setup.

pub mod image;

pub use image::{encode_png_base64, is_pdf_bytes, is_pdf_file, is_pdf_path, load_image};

/// Initializes the tracing subscriber for logging.
///
/// The filter comes from `RUST_LOG`, e.g. `RUST_LOG=notes_ocr=debug`.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
