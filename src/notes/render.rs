//! Page rasterization.
//!
//! PDFs are rendered through PDFium; plain raster images (PNG, JPEG, TIFF...)
//! are decoded directly and treated as a one-page document. The document
//! handle is opened and dropped inside each call.

use crate::core::errors::{NotesError, NotesResult};
use crate::utils::is_pdf_file;
use image::RgbImage;
use pdfium_render::prelude::*;
use std::path::Path;

/// PDF user-space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Renders one page of a document to a bitmap.
pub trait PageRasterizer: Send + Sync {
    /// Renders page `page_index` (zero-based) of `path` at `dpi`.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::Render`] when the document cannot be decoded or
    /// the page index is out of range.
    fn render(&self, path: &Path, page_index: usize, dpi: u32) -> NotesResult<RgbImage>;
}

/// Rasterizer backed by PDFium for PDFs and the `image` crate for raster files.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl std::fmt::Debug for PdfiumRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumRasterizer").finish_non_exhaustive()
    }
}

impl PdfiumRasterizer {
    /// Binds the PDFium library, searching the working directory and the
    /// usual system locations before falling back to the system loader.
    pub fn new() -> NotesResult<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("/usr/lib"))
            })
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                    "/usr/local/lib",
                ))
            })
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| NotesError::ConfigError {
                message: format!("could not find PDFium library: {e}"),
            })?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    fn render_pdf(&self, path: &Path, page_index: usize, dpi: u32) -> NotesResult<RgbImage> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| NotesError::render(page_index, e.to_string()))?;

        let pages = document.pages();
        let page_count = pages.len() as usize;
        let index = PdfPageIndex::try_from(page_index)
            .ok()
            .filter(|_| page_index < page_count)
            .ok_or_else(|| {
                NotesError::render(
                    page_index,
                    format!("page index out of range (document has {page_count} pages)"),
                )
            })?;

        let page = pages
            .get(index)
            .map_err(|e| NotesError::render(page_index, e.to_string()))?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / POINTS_PER_INCH)
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| NotesError::render(page_index, e.to_string()))?;

        Ok(bitmap.as_image().to_rgb8())
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render(&self, path: &Path, page_index: usize, dpi: u32) -> NotesResult<RgbImage> {
        if dpi == 0 {
            return Err(NotesError::render(page_index, "dpi must be greater than 0"));
        }

        let image = if is_pdf_file(path) {
            self.render_pdf(path, page_index, dpi)?
        } else {
            render_raster(path, page_index)?
        };

        tracing::debug!(
            path = %path.display(),
            page = page_index,
            dpi,
            width = image.width(),
            height = image.height(),
            "page rendered"
        );
        Ok(image)
    }
}

/// Decodes a raster image file as a single-page document.
pub(crate) fn render_raster(path: &Path, page_index: usize) -> NotesResult<RgbImage> {
    if page_index != 0 {
        return Err(NotesError::render(
            page_index,
            "page index out of range (image files have 1 page)",
        ));
    }
    let image = image::open(path).map_err(|e| NotesError::render(page_index, e.to_string()))?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_render_raster_reads_first_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        RgbImage::from_pixel(40, 20, Rgb([200, 10, 10]))
            .save(&path)
            .unwrap();

        let image = render_raster(&path, 0).unwrap();
        assert_eq!(image.dimensions(), (40, 20));
        assert_eq!(image.get_pixel(0, 0), &Rgb([200, 10, 10]));
    }

    #[test]
    fn test_render_raster_rejects_other_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        RgbImage::new(4, 4).save(&path).unwrap();

        let err = render_raster(&path, 1).unwrap_err();
        assert!(matches!(err, NotesError::Render { page: 1, .. }));
    }

    #[test]
    fn test_render_raster_reports_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        assert!(matches!(
            render_raster(&path, 0),
            Err(NotesError::Render { page: 0, .. })
        ));
    }
}
