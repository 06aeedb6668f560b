//! Image decoding for the augmentation pipeline.
//!
//! This module provides functionality for:
//! - Loading image files of any format enabled in the `image` crate
//! - Converting decoded images into the interleaved 8-bit [`DecodedImage`]
//!
//! # Orientation
//!
//! EXIF orientation is deliberately not applied. Annotation coordinates refer
//! to the stored pixel grid, so the pixels must be used exactly as stored.

mod file;
mod types;

pub use file::{decode_bytes, load_image};
pub use types::{DecodedImage, ImageIoError};
