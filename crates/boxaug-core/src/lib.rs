//! Boxaug Core - geometric augmentation for object-detection datasets
//!
//! This crate rotates and flips images together with their axis-aligned
//! bounding boxes, and drives the eight-variant augmentation of a Pascal VOC
//! dataset.
//!
//! # Module Structure
//!
//! - `bbox` - Axis-aligned boxes in pixel coordinates
//! - `decode` / `encode` - In-memory image buffer and file I/O
//! - `transform` - Rotator, Flipper, transform chains
//! - `annotation` - Pascal VOC XML records
//! - `batch` - Directory-level driver with per-item results

pub mod annotation;
pub mod batch;
pub mod bbox;
pub mod decode;
pub mod encode;
pub mod transform;

pub use annotation::VocAnnotation;
pub use batch::{AugmentConfig, Augmenter, BatchError, BatchReport};
pub use bbox::BoundingBox;
pub use decode::DecodedImage;
pub use transform::{
    flip, flip_code, rotate, rotated_canvas, standard_variants, Augmented, FlipAxis, Transform,
    TransformChain, TransformError,
};
