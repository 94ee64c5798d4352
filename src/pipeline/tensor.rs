//! Host image container: `DynamicImage` ↔ `[1, H, W, 3]` float tensor.
//!
//! The node graph passes images as batches of normalised RGB intensities in
//! `[0.0, 1.0]`, channel-last, with a leading batch dimension. The loader
//! produces one single-image batch per page and the OCR runner expects the
//! same shape back.

use crate::error::SwanOcrError;
use image::{DynamicImage, RgbImage};
use ndarray::Array4;

/// One host image: shape `[1, height, width, 3]`, values in `[0.0, 1.0]`.
pub type ImageTensor = Array4<f32>;

/// Number of colour channels in a host image.
pub const CHANNELS: usize = 3;

/// Convert any image to a host tensor, forcing 3-channel RGB.
pub fn image_to_tensor(image: &DynamicImage) -> ImageTensor {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    Array4::from_shape_fn(
        (1, height as usize, width as usize, CHANNELS),
        |(_, y, x, c)| rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
    )
}

/// Convert a host tensor back to an 8-bit RGB bitmap.
///
/// Intensities are clamped to `[0, 1]`, scaled by 255 and rounded.
pub fn tensor_to_image(tensor: &ImageTensor) -> Result<RgbImage, SwanOcrError> {
    let (batch, height, width, channels) = tensor.dim();
    if batch != 1 || channels != CHANNELS {
        return Err(SwanOcrError::InvalidImage(format!(
            "expected shape [1, H, W, 3], got [{batch}, {height}, {width}, {channels}]"
        )));
    }
    if height == 0 || width == 0 {
        return Err(SwanOcrError::InvalidImage("image has no pixels".into()));
    }

    let bytes: Vec<u8> = tensor
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();

    RgbImage::from_raw(width as u32, height as u32, bytes)
        .ok_or_else(|| SwanOcrError::InvalidImage("pixel buffer does not match shape".into()))
}
