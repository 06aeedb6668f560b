//! Image file decoding.

use std::io::Cursor;
use std::path::Path;

use image::ImageReader;

use super::{DecodedImage, ImageIoError};

/// Load an image file, guessing the format from its content.
///
/// # Errors
///
/// Returns `ImageIoError::Io` if the file cannot be opened and
/// `ImageIoError::Decode` if its content is not a supported image.
pub fn load_image(path: &Path) -> Result<DecodedImage, ImageIoError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;

    let img = reader
        .decode()
        .map_err(|e| ImageIoError::Decode(e.to_string()))?;

    Ok(DecodedImage::from_dynamic(img))
}

/// Decode an in-memory encoded image.
pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedImage, ImageIoError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;

    let img = reader
        .decode()
        .map_err(|e| ImageIoError::Decode(e.to_string()))?;

    Ok(DecodedImage::from_dynamic(img))
}
