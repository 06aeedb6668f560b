//! Geometric transforms of an image together with its bounding boxes.
//!
//! Every transform is a pure function of its inputs: it borrows the source
//! image and boxes and returns a freshly allocated [`Augmented`] pair.
//!
//! # Coordinate System
//!
//! - Box coordinates are integer pixels, origin at the top-left corner
//! - Rotation angles are in degrees; the image and its boxes turn together
//! - Box order is preserved by every operation

mod flip;
mod rotation;

pub use flip::{flip, flip_boxes, flip_code, FlipAxis};
pub use rotation::{
    rotate, rotate_boxes, rotate_with, rotated_canvas, Interpolation, BACKGROUND,
};

use thiserror::Error;

use crate::bbox::BoundingBox;
use crate::decode::DecodedImage;

/// Errors raised by transform inputs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    /// An argument is outside its accepted set of values.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A box is malformed or lies outside its image.
    #[error("Malformed box #{index} {bbox} for a {width}x{height} image")]
    MalformedBox {
        index: usize,
        bbox: BoundingBox,
        width: u32,
        height: u32,
    },
}

/// A transformed image with its transformed boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Augmented {
    pub image: DecodedImage,
    pub boxes: Vec<BoundingBox>,
}

impl Augmented {
    /// Owned copy of the inputs, the result of the identity transform.
    pub fn identity(image: &DecodedImage, boxes: &[BoundingBox]) -> Self {
        Self {
            image: image.clone(),
            boxes: boxes.to_vec(),
        }
    }
}

/// A single transform step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// Rotation by the given degrees about the image center.
    Rotation(f64),
    /// Mirror along an axis.
    Flip(FlipAxis),
}

impl Transform {
    /// Apply this step to an image and its boxes.
    pub fn apply(&self, image: &DecodedImage, boxes: &[BoundingBox]) -> Augmented {
        match *self {
            Transform::Rotation(degrees) => rotate(image, degrees, boxes),
            Transform::Flip(axis) => flip(image, axis, boxes),
        }
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transform::Rotation(degrees) => write!(f, "rotate({degrees})"),
            Transform::Flip(axis) => write!(f, "flip({axis})"),
        }
    }
}

/// An ordered sequence of steps; each consumes the previous step's output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformChain {
    steps: Vec<Transform>,
}

impl TransformChain {
    /// The empty chain, which copies its input.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn then(mut self, step: Transform) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[Transform] {
        &self.steps
    }

    /// Apply all steps in order.
    pub fn apply(&self, image: &DecodedImage, boxes: &[BoundingBox]) -> Augmented {
        let mut steps = self.steps.iter();
        let Some(first) = steps.next() else {
            return Augmented::identity(image, boxes);
        };

        steps.fold(first.apply(image, boxes), |acc, step| {
            step.apply(&acc.image, &acc.boxes)
        })
    }
}

impl From<Vec<Transform>> for TransformChain {
    fn from(steps: Vec<Transform>) -> Self {
        Self { steps }
    }
}

impl std::fmt::Display for TransformChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("identity");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// The eight variants emitted per annotated image, by variant index:
///
/// 0 identity, 1-3 rotate 90/180/270, 4 horizontal flip,
/// 5-7 horizontal flip then rotate 90/180/270.
pub fn standard_variants() -> Vec<TransformChain> {
    let turns = [90.0, 180.0, 270.0];
    let mirror = Transform::Flip(FlipAxis::Horizontal);

    let mut variants = vec![TransformChain::identity()];
    variants.extend(
        turns
            .iter()
            .map(|&deg| TransformChain::identity().then(Transform::Rotation(deg))),
    );
    variants.push(TransformChain::identity().then(mirror));
    variants.extend(turns.iter().map(|&deg| {
        TransformChain::identity()
            .then(mirror)
            .then(Transform::Rotation(deg))
    }));
    variants
}

/// Check that every box is well formed and lies inside the image.
///
/// The rotator and flipper accept any box; this is the precondition used by
/// callers that want to reject bad annotations up front.
pub fn check_boxes(width: u32, height: u32, boxes: &[BoundingBox]) -> Result<(), TransformError> {
    match boxes
        .iter()
        .position(|b| !b.is_well_formed() || !b.fits_within(width, height))
    {
        Some(index) => Err(TransformError::MalformedBox {
            index,
            bbox: boxes[index],
            width,
            height,
        }),
        None => Ok(()),
    }
}
