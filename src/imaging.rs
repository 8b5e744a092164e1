//! Image decoding and compositing helpers.

use base64::Engine;
use base64::engine::general_purpose;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage, imageops};

use crate::error::FitroomError;

/// Decodes a base64 image payload, verifying the bytes load as an image,
/// and returns the raw bytes for storage or upload.
pub fn decode_image_bytes(data: &str) -> Result<Vec<u8>, FitroomError> {
    let bytes = general_purpose::STANDARD.decode(data)?;
    image::load_from_memory(&bytes)?;
    Ok(bytes)
}

/// Decodes a base64 image payload into a loaded image.
pub fn decode_image(data: &str) -> Result<DynamicImage, FitroomError> {
    let bytes = general_purpose::STANDARD.decode(data)?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Composites two images side by side on a white canvas.
///
/// Both inputs are rescaled to the larger of the two heights, preserving
/// aspect ratio with truncating integer widths; the canvas is the sum of
/// the scaled widths. Not used by the request pipeline, which hands the
/// model both images separately.
pub fn composite_side_by_side(a: &DynamicImage, b: &DynamicImage) -> DynamicImage {
    let target_height = a.height().max(b.height());
    let a = scale_to_height(a, target_height);
    let b = scale_to_height(b, target_height);

    let mut canvas = RgbImage::from_pixel(
        a.width() + b.width(),
        target_height,
        Rgb([255, 255, 255]),
    );
    imageops::overlay(&mut canvas, &a.to_rgb8(), 0, 0);
    imageops::overlay(&mut canvas, &b.to_rgb8(), i64::from(a.width()), 0);
    DynamicImage::ImageRgb8(canvas)
}

fn scale_to_height(img: &DynamicImage, target_height: u32) -> DynamicImage {
    let width = u64::from(target_height) * u64::from(img.width()) / u64::from(img.height());
    let width = u32::try_from(width).unwrap_or(u32::MAX).max(1);
    img.resize_exact(width, target_height, FilterType::Triangle)
}
