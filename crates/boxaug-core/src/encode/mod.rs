//! Image encoding for augmented outputs.
//!
//! This module provides functionality for:
//! - Encoding a [`DecodedImage`](crate::decode::DecodedImage) to any enabled format
//! - Saving to a path, choosing the format from the file extension
//!
//! Alpha is dropped when the target format cannot store it (JPEG).

mod file;

pub use file::{encode_image, save_image};
