//! Image and document file helpers.

use crate::core::errors::{NotesError, NotesResult, ProcessingStage};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{ImageFormat, RgbImage};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

/// Loads an image file and converts it to RGB.
pub fn load_image(path: &Path) -> NotesResult<RgbImage> {
    let img = image::open(path).map_err(NotesError::ImageLoad)?;
    Ok(img.to_rgb8())
}

/// Encodes `image` as PNG and returns it base64-encoded.
pub fn encode_png_base64(image: &RgbImage) -> NotesResult<String> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| NotesError::processing(ProcessingStage::Encoding, "encode preview as PNG", e))?;
    Ok(BASE64.encode(buf.into_inner()))
}

/// Check if bytes represent a PDF file (magic bytes: %PDF)
pub fn is_pdf_bytes(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Check if a file path has a PDF extension
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Check if the file at `path` is a PDF, by extension or leading magic bytes.
pub fn is_pdf_file(path: &Path) -> bool {
    if is_pdf_path(path) {
        return true;
    }
    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| is_pdf_bytes(&magic))
        .unwrap_or(false)
}
