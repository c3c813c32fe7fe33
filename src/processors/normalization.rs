//! Image normalization into NCHW tensors.
//!
//! Detection uses ImageNet statistics; recognition maps pixels to `[-1, 1]`.
//! Both model families were trained on BGR input, so channels are written in
//! the configured color order.

use crate::core::errors::{NotesError, NotesResult};
use image::RgbImage;
use ndarray::Array4;

/// Color channel order written into the tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorOrder {
    /// Red, Green, Blue order
    RGB,
    /// Blue, Green, Red order (PaddlePaddle-trained models)
    #[default]
    BGR,
}

/// Normalizes images into `[1, 3, H, W]` tensors.
///
/// Each value becomes `pixel * alpha[c] + beta[c]` where
/// `alpha = scale / std` and `beta = -mean / std`.
#[derive(Debug, Clone)]
pub struct NormalizeImage {
    /// Scaling factors for each channel (alpha = scale / std)
    pub alpha: [f32; 3],
    /// Offset values for each channel (beta = -mean / std)
    pub beta: [f32; 3],
    /// Color channel order
    pub color_order: ColorOrder,
}

impl NormalizeImage {
    /// Creates a normalizer from scale, mean and std given in output channel order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `scale` or any `std` entry is not positive.
    pub fn new(scale: f32, mean: [f32; 3], std: [f32; 3], color_order: ColorOrder) -> NotesResult<Self> {
        if scale <= 0.0 {
            return Err(NotesError::ConfigError {
                message: "Scale must be greater than 0".to_string(),
            });
        }
        for (i, &s) in std.iter().enumerate() {
            if s <= 0.0 {
                return Err(NotesError::ConfigError {
                    message: format!(
                        "Standard deviation at index {i} must be greater than 0, got {s}"
                    ),
                });
            }
        }

        Ok(Self::from_stats(scale, mean, std, color_order))
    }

    fn from_stats(scale: f32, mean: [f32; 3], std: [f32; 3], color_order: ColorOrder) -> Self {
        Self {
            alpha: [scale / std[0], scale / std[1], scale / std[2]],
            beta: [-mean[0] / std[0], -mean[1] / std[1], -mean[2] / std[2]],
            color_order,
        }
    }

    /// ImageNet statistics, used by the DB detector.
    pub fn imagenet() -> Self {
        // RGB statistics reordered to BGR.
        Self::from_stats(
            1.0 / 255.0,
            [0.406, 0.456, 0.485],
            [0.225, 0.224, 0.229],
            ColorOrder::BGR,
        )
    }

    /// `(x / 255 - 0.5) / 0.5`, used by CTC recognizers.
    pub fn for_ocr_recognition() -> Self {
        Self::from_stats(1.0 / 255.0, [0.5; 3], [0.5; 3], ColorOrder::BGR)
    }

    /// Normalizes one image into a `[1, 3, H, W]` tensor.
    pub fn normalize(&self, img: &RgbImage) -> Array4<f32> {
        let (width, height) = img.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        self.write_into(img, &mut tensor, 0, 0.0);
        tensor
    }

    /// Writes `img` into `tensor[batch_index]`, left-aligned.
    ///
    /// Columns beyond the image width are set to `pad_value`.
    pub fn write_into(&self, img: &RgbImage, tensor: &mut Array4<f32>, batch_index: usize, pad_value: f32) {
        let tensor_h = tensor.shape()[2];
        let tensor_w = tensor.shape()[3];
        let channel_map = match self.color_order {
            ColorOrder::RGB => [0usize, 1, 2],
            ColorOrder::BGR => [2usize, 1, 0],
        };

        for y in 0..tensor_h {
            for x in 0..tensor_w {
                let inside = (x as u32) < img.width() && (y as u32) < img.height();
                for (c, &src) in channel_map.iter().enumerate() {
                    tensor[[batch_index, c, y, x]] = if inside {
                        let value = img.get_pixel(x as u32, y as u32)[src] as f32;
                        value * self.alpha[c] + self.beta[c]
                    } else {
                        pad_value
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_recognition_normalization_range() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));

        let tensor = NormalizeImage::for_ocr_recognition().normalize(&img);
        assert_eq!(tensor.shape(), &[1, 3, 1, 2]);
        assert!((tensor[[0, 0, 0, 0]] + 1.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 0, 1]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bgr_channel_order() {
        let mut img = RgbImage::new(1, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));

        let norm = NormalizeImage::new(1.0 / 255.0, [0.0; 3], [1.0; 3], ColorOrder::BGR).unwrap();
        let tensor = norm.normalize(&img);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        assert!((tensor[[0, 2, 0, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_padding_columns() {
        let img = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        let mut tensor = Array4::<f32>::zeros((1, 3, 1, 3));
        NormalizeImage::for_ocr_recognition().write_into(&img, &mut tensor, 0, 0.0);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 0, 0, 2]], 0.0);
    }

    #[test]
    fn test_invalid_std_is_rejected() {
        assert!(NormalizeImage::new(1.0, [0.0; 3], [0.0, 1.0, 1.0], ColorOrder::RGB).is_err());
    }
}
