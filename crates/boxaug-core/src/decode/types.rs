//! Core types for in-memory image buffers.

use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use thiserror::Error;

/// Error types for image loading, saving and buffer conversion.
#[derive(Debug, Error)]
pub enum ImageIoError {
    /// The file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes are not a decodable image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// The encoder rejected the image.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// The target file name does not name a known image format.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The channel count is not one of 1, 2, 3 or 4.
    #[error("Unsupported pixel layout: {channels} channels")]
    UnsupportedLayout { channels: u8 },

    /// Pixel buffer length does not match the dimensions.
    #[error("Invalid pixel buffer: expected {expected} bytes, got {actual}")]
    InvalidBuffer { expected: usize, actual: usize },
}

/// A decoded 8-bit image with interleaved channels.
///
/// Supported depths are 1 (gray), 2 (gray + alpha), 3 (RGB) and 4 (RGBA).
/// Every transform preserves the channel count of its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Number of interleaved channels per pixel.
    pub channels: u8,
    /// Pixel data in row-major order.
    /// Length should be width * height * channels.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Create a new DecodedImage with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * channels as usize,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            channels,
            pixels,
        }
    }

    /// Create a DecodedImage, validating the layout and buffer length.
    pub fn try_new(
        width: u32,
        height: u32,
        channels: u8,
        pixels: Vec<u8>,
    ) -> Result<Self, ImageIoError> {
        if !(1..=4).contains(&channels) {
            return Err(ImageIoError::UnsupportedLayout { channels });
        }
        let expected = width as usize * height as usize * channels as usize;
        if pixels.len() != expected {
            return Err(ImageIoError::InvalidBuffer {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    /// Create an image of the given size filled with a single value.
    pub fn filled(width: u32, height: u32, channels: u8, value: u8) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self::new(width, height, channels, vec![value; len])
    }

    /// Convert from any `image::DynamicImage`.
    ///
    /// 8-bit gray, gray-alpha, RGB and RGBA buffers are taken over as-is.
    /// Wider sample types are narrowed to 8 bits, keeping the channel count.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let (channels, pixels) = match img {
            DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
            other => match other.color().channel_count() {
                1 => (1, other.into_luma8().into_raw()),
                2 => (2, other.into_luma_alpha8().into_raw()),
                4 => (4, other.into_rgba8().into_raw()),
                _ => (3, other.into_rgb8().into_raw()),
            },
        };
        Self {
            width,
            height,
            channels,
            pixels,
        }
    }

    /// Convert to an `image::DynamicImage` for encoding.
    pub fn to_dynamic(&self) -> Result<DynamicImage, ImageIoError> {
        let (w, h) = (self.width, self.height);
        let pixels = self.pixels.clone();
        let img = match self.channels {
            1 => GrayImage::from_raw(w, h, pixels).map(DynamicImage::ImageLuma8),
            2 => GrayAlphaImage::from_raw(w, h, pixels).map(DynamicImage::ImageLumaA8),
            3 => RgbImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgba8),
            channels => return Err(ImageIoError::UnsupportedLayout { channels }),
        };
        img.ok_or(ImageIoError::InvalidBuffer {
            expected: self.row_len() * h as usize,
            actual: self.pixels.len(),
        })
    }

    /// Number of bytes in one row.
    #[inline]
    pub fn row_len(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    /// Channel values of the pixel at `(x, y)`, or `None` outside the image.
    #[inline]
    pub fn pixel(&self, x: i64, y: i64) -> Option<&[u8]> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        let channels = self.channels as usize;
        let idx = y as usize * self.row_len() + x as usize * channels;
        self.pixels.get(idx..idx + channels)
    }

    /// Whether the last channel carries alpha.
    pub fn has_alpha(&self) -> bool {
        matches!(self.channels, 2 | 4)
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}
