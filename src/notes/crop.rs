//! Cropping the Notes region out of a rendered page.

use crate::core::ConfigValidator;
use crate::core::errors::{NotesError, NotesResult};
use crate::notes::layout::CropTemplate;
use image::RgbImage;
use image::imageops::{self, FilterType};

/// The cropped Notes region.
#[derive(Debug, Clone)]
pub struct CropRegion {
    /// Cropped (and possibly downscaled) image
    pub image: RgbImage,
    /// Absolute pixel rectangle `[x0, y0, x1, y1]` on the page, before downscaling
    pub bbox: [u32; 4],
}

/// Crops `template` out of `page`.
///
/// Pixel bounds are the fractions multiplied by the page size and truncated,
/// so the rectangle always lies within the page.
pub fn crop_region(page: &RgbImage, template: &CropTemplate) -> NotesResult<CropRegion> {
    template
        .validate()
        .map_err(|e| NotesError::invalid_input(format!("crop template: {e}")))?;

    let (width, height) = page.dimensions();
    let scale = |size: u32, frac: f64| ((size as f64 * frac) as u32).min(size);
    let x0 = scale(width, template.x_min);
    let y0 = scale(height, template.y_min);
    let x1 = scale(width, template.x_max).max(x0);
    let y1 = scale(height, template.y_max).max(y0);

    let image = imageops::crop_imm(page, x0, y0, x1 - x0, y1 - y0).to_image();
    Ok(CropRegion {
        image,
        bbox: [x0, y0, x1, y1],
    })
}

/// Downscales `image` so neither side exceeds `max_pixels`, keeping aspect
/// ratio. Images already within the limit are returned unchanged.
pub fn limit_size(image: RgbImage, max_pixels: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    if w <= max_pixels && h <= max_pixels {
        return image;
    }

    let scale = (max_pixels as f64 / w as f64).min(max_pixels as f64 / h as f64);
    let new_w = ((w as f64 * scale) as u32).clamp(1, max_pixels.max(1));
    let new_h = ((h as f64 * scale) as u32).clamp(1, max_pixels.max(1));
    tracing::debug!(from_w = w, from_h = h, to_w = new_w, to_h = new_h, "downscaling crop");
    imageops::resize(&image, new_w, new_h, FilterType::Lanczos3)
}
