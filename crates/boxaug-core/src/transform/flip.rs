//! Mirror flips of an image and its boxes.
//!
//! Flips never resample or resize, so box mapping is exact integer
//! arithmetic:
//!
//! | axis       | box                                     |
//! |------------|-----------------------------------------|
//! | Horizontal | `[w-xmax, ymin, w-xmin, ymax]`          |
//! | Vertical   | `[xmin, h-ymax, xmax, h-ymin]`          |
//! | Both       | `[w-xmax, h-ymax, w-xmin, h-ymin]`      |

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{Augmented, TransformError};
use crate::bbox::BoundingBox;
use crate::decode::DecodedImage;

/// Mirror axis, with the conventional integer codes `1`, `0` and `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipAxis {
    /// Mirror left-right (code 1).
    Horizontal,
    /// Mirror top-bottom (code 0).
    Vertical,
    /// Mirror both ways, a half turn (code -1).
    Both,
}

impl FlipAxis {
    /// Integer code of this axis.
    pub fn code(self) -> i32 {
        match self {
            FlipAxis::Horizontal => 1,
            FlipAxis::Vertical => 0,
            FlipAxis::Both => -1,
        }
    }

    #[inline]
    fn mirrors_x(self) -> bool {
        matches!(self, FlipAxis::Horizontal | FlipAxis::Both)
    }

    #[inline]
    fn mirrors_y(self) -> bool {
        matches!(self, FlipAxis::Vertical | FlipAxis::Both)
    }
}

impl TryFrom<i32> for FlipAxis {
    type Error = TransformError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(FlipAxis::Horizontal),
            0 => Ok(FlipAxis::Vertical),
            -1 => Ok(FlipAxis::Both),
            _ => Err(TransformError::InvalidArgument(format!(
                "invalid flip axis {code}, the correct value is 1, 0, or -1"
            ))),
        }
    }
}

impl std::fmt::Display for FlipAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FlipAxis::Horizontal => "horizontal",
            FlipAxis::Vertical => "vertical",
            FlipAxis::Both => "both",
        };
        f.write_str(name)
    }
}

/// Flip an image and its boxes along `axis`.
pub fn flip(image: &DecodedImage, axis: FlipAxis, boxes: &[BoundingBox]) -> Augmented {
    Augmented {
        image: mirror(image, axis),
        boxes: flip_boxes(image.width, image.height, axis, boxes),
    }
}

/// Flip using a raw axis code, validated before any pixel is touched.
///
/// # Errors
///
/// Returns `TransformError::InvalidArgument` for any code other than
/// `1`, `0` or `-1`.
pub fn flip_code(
    image: &DecodedImage,
    code: i32,
    boxes: &[BoundingBox],
) -> Result<Augmented, TransformError> {
    let axis = FlipAxis::try_from(code)?;
    Ok(flip(image, axis, boxes))
}

/// Map boxes of a `width` x `height` image through a flip along `axis`.
///
/// Coordinates that leave the `i32` range saturate.
pub fn flip_boxes(
    width: u32,
    height: u32,
    axis: FlipAxis,
    boxes: &[BoundingBox],
) -> Vec<BoundingBox> {
    let (w, h) = (i64::from(width), i64::from(height));
    let reflect = |extent: i64, v: i32| saturate(extent - i64::from(v));

    boxes
        .iter()
        .map(|b| {
            let (xmin, xmax) = if axis.mirrors_x() {
                (reflect(w, b.xmax), reflect(w, b.xmin))
            } else {
                (b.xmin, b.xmax)
            };
            let (ymin, ymax) = if axis.mirrors_y() {
                (reflect(h, b.ymax), reflect(h, b.ymin))
            } else {
                (b.ymin, b.ymax)
            };
            BoundingBox::new(xmin, ymin, xmax, ymax)
        })
        .collect()
}

#[inline]
fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn mirror(image: &DecodedImage, axis: FlipAxis) -> DecodedImage {
    let channels = image.channels as usize;
    let row_len = image.row_len();

    if row_len == 0 || image.pixels.is_empty() {
        return image.clone();
    }

    let mut pixels = if axis.mirrors_y() {
        let mut out = vec![0u8; image.pixels.len()];
        out.par_chunks_exact_mut(row_len)
            .zip(image.pixels.par_chunks_exact(row_len).rev())
            .for_each(|(dst, src)| dst.copy_from_slice(src));
        out
    } else {
        image.pixels.clone()
    };

    if axis.mirrors_x() {
        pixels.par_chunks_exact_mut(row_len).for_each(|row| {
            let cols = row.len() / channels;
            for i in 0..cols / 2 {
                let j = cols - 1 - i;
                for c in 0..channels {
                    row.swap(i * channels + c, j * channels + c);
                }
            }
        });
    }

    DecodedImage::new(image.width, image.height, image.channels, pixels)
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn axis_strategy() -> impl Strategy<Value = FlipAxis> {
        prop_oneof![
            Just(FlipAxis::Horizontal),
            Just(FlipAxis::Vertical),
            Just(FlipAxis::Both),
        ]
    }

    /// Random image together with boxes inside it.
    fn image_and_boxes() -> impl Strategy<Value = (DecodedImage, Vec<BoundingBox>)> {
        (1u32..=24, 1u32..=24, 1u8..=4).prop_flat_map(|(w, h, channels)| {
            let size = (w * h) as usize * channels as usize;
            let boxes = prop::collection::vec(
                (0..=w as i32, 0..=h as i32, 0..=w as i32, 0..=h as i32)
                    .prop_map(|(x0, y0, x1, y1)| BoundingBox::from_corners(x0, y0, x1, y1)),
                0..6,
            );
            (
                prop::collection::vec(any::<u8>(), size..=size)
                    .prop_map(move |pixels| DecodedImage::new(w, h, channels, pixels)),
                boxes,
            )
        })
    }

    proptest! {
        /// Property: flipping twice restores image and boxes.
        #[test]
        fn prop_flip_is_involution(
            (img, boxes) in image_and_boxes(),
            axis in axis_strategy(),
        ) {
            let once = flip(&img, axis, &boxes);
            let twice = flip(&once.image, axis, &once.boxes);

            prop_assert_eq!(twice.image, img);
            prop_assert_eq!(twice.boxes, boxes);
        }

        /// Property: flipped boxes stay well formed and inside the image.
        #[test]
        fn prop_flipped_boxes_valid(
            (img, boxes) in image_and_boxes(),
            axis in axis_strategy(),
        ) {
            let out = flip(&img, axis, &boxes);

            prop_assert_eq!(out.boxes.len(), boxes.len());
            for (before, after) in boxes.iter().zip(out.boxes.iter()) {
                prop_assert!(after.is_well_formed());
                prop_assert!(after.fits_within(img.width, img.height));
                prop_assert_eq!(after.width(), before.width());
                prop_assert_eq!(after.height(), before.height());
            }
        }

        /// Property: flipping both ways equals flipping each way in turn.
        #[test]
        fn prop_both_is_horizontal_then_vertical((img, boxes) in image_and_boxes()) {
            let h = flip(&img, FlipAxis::Horizontal, &boxes);
            let hv = flip(&h.image, FlipAxis::Vertical, &h.boxes);

            prop_assert_eq!(hv, flip(&img, FlipAxis::Both, &boxes));
        }

        /// Property: only the three documented codes are accepted.
        #[test]
        fn prop_unknown_codes_rejected(code in any::<i32>()) {
            let result = FlipAxis::try_from(code);
            prop_assert_eq!(result.is_ok(), (-1..=1).contains(&code));
        }
    }
}
