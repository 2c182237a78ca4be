//! SIMD-accelerated downscaling for signature computation.
//!
//! Uses fast_image_resize, which picks AVX2/NEON kernels when available.

use crate::error::HashError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GrayImage};

/// Convert to grayscale, then resize to exactly `width` x `height`.
pub fn resize_to_grayscale(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<GrayImage, HashError> {
    let gray = image.to_luma8();
    let (src_width, src_height) = gray.dimensions();

    if src_width == 0 || src_height == 0 || width == 0 || height == 0 {
        return Err(HashError::ComputationFailed(format!(
            "cannot resize {}x{} to {}x{}",
            src_width, src_height, width, height
        )));
    }

    let src_image = Image::from_vec_u8(src_width, src_height, gray.into_raw(), PixelType::U8)
        .map_err(|e| HashError::ComputationFailed(format!("source buffer: {}", e)))?;
    let mut dst_image = Image::new(width, height, PixelType::U8);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    Resizer::new()
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| HashError::ComputationFailed(format!("resize: {}", e)))?;

    GrayImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| HashError::ComputationFailed("result buffer size mismatch".to_string()))
}
