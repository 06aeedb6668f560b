//! Image file encoding.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::decode::{DecodedImage, ImageIoError};

/// Encode an image to bytes in the given format.
///
/// # Errors
///
/// Returns `ImageIoError::InvalidBuffer` or `UnsupportedLayout` for a
/// malformed buffer and `ImageIoError::Encode` if the encoder fails.
pub fn encode_image(image: &DecodedImage, format: ImageFormat) -> Result<Vec<u8>, ImageIoError> {
    let mut dynamic = image.to_dynamic()?;

    if image.has_alpha() && !supports_alpha(format) {
        dynamic = match image.channels {
            2 => DynamicImage::ImageLuma8(dynamic.to_luma8()),
            _ => DynamicImage::ImageRgb8(dynamic.to_rgb8()),
        };
    }

    let mut buffer = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut buffer, format)
        .map_err(|e| ImageIoError::Encode(e.to_string()))?;

    Ok(buffer.into_inner())
}

/// Save an image, picking the format from the path's extension.
pub fn save_image(image: &DecodedImage, path: &Path) -> Result<(), ImageIoError> {
    let format = ImageFormat::from_path(path)
        .map_err(|_| ImageIoError::UnsupportedFormat(path.display().to_string()))?;

    let bytes = encode_image(image, format)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn supports_alpha(format: ImageFormat) -> bool {
    !matches!(format, ImageFormat::Jpeg)
}
