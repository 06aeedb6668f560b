//! Image rotation with canvas growth and bounding-box mapping.
//!
//! The image is rotated about its center and the output canvas is enlarged
//! so that no content is clipped. Boxes are carried through the same
//! transform and collapsed back to axis-aligned boxes.
//!
//! # Convention
//!
//! Box corners are rotated in math space (y up) relative to the source
//! center, which is the same direction the pixel transform turns the image
//! on screen. The forward pixel transform is
//! ```text
//! | cos  sin  (1-cos)*cx - sin*cy + (nw/2 - cx) |
//! | -sin cos  sin*cx + (1-cos)*cy + (nh/2 - cy) |
//! ```
//! and the output is resampled through its inverse: for each output pixel,
//! we calculate which source position contributes to it and interpolate.

use rayon::prelude::*;

use super::Augmented;
use crate::bbox::BoundingBox;
use crate::decode::DecodedImage;

/// Fill value for output pixels that map outside the source (white).
pub const BACKGROUND: u8 = 255;

/// Interpolation filter for rotation resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Nearest source pixel. Exact for right-angle rotations.
    Nearest,
    /// Linear blend of the 4 nearest pixels.
    #[default]
    Bilinear,
}

/// Compute the canvas that holds an image rotated by `degrees`.
///
/// `new_w = w*|cos| + h*|sin|` and `new_h = w*|sin| + h*|cos|`, truncated.
/// No angle is special-cased, so right angles can come out one pixel short
/// or long depending on floating-point noise in `sin`/`cos`.
pub fn rotated_canvas(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let (sin, cos) = sin_cos(degrees);
    let (w, h) = (f64::from(width), f64::from(height));

    let new_w = (w * cos.abs() + h * sin.abs()) as u32;
    let new_h = (w * sin.abs() + h * cos.abs()) as u32;

    (new_w, new_h)
}

/// Rotate an image and its boxes by `degrees`, using bilinear resampling.
pub fn rotate(image: &DecodedImage, degrees: f64, boxes: &[BoundingBox]) -> Augmented {
    rotate_with(image, degrees, boxes, Interpolation::Bilinear)
}

/// Rotate an image and its boxes by `degrees` with the given filter.
///
/// The result has the canvas size of [`rotated_canvas`] and one output box
/// per input box, in input order. Pixels that map outside the source are
/// filled with [`BACKGROUND`].
pub fn rotate_with(
    image: &DecodedImage,
    degrees: f64,
    boxes: &[BoundingBox],
    interpolation: Interpolation,
) -> Augmented {
    let frame = RotationFrame::new(image.width, image.height, degrees);
    let pixels = resample(image, &frame, interpolation);

    Augmented {
        image: DecodedImage::new(frame.dst_w, frame.dst_h, image.channels, pixels),
        boxes: frame.map_boxes(boxes),
    }
}

/// Map boxes of a `width` x `height` image through a rotation by `degrees`.
///
/// This is the box half of [`rotate`] and needs no pixel data.
pub fn rotate_boxes(
    width: u32,
    height: u32,
    degrees: f64,
    boxes: &[BoundingBox],
) -> Vec<BoundingBox> {
    RotationFrame::new(width, height, degrees).map_boxes(boxes)
}

#[inline]
fn sin_cos(degrees: f64) -> (f64, f64) {
    let rad = degrees.to_radians();
    (rad.sin(), rad.cos())
}

/// Geometry shared by the pixel and box mappings of one rotation.
struct RotationFrame {
    sin: f64,
    cos: f64,
    right_angle: bool,
    src_cx: f64,
    src_cy: f64,
    dst_w: u32,
    dst_h: u32,
    dst_cx: f64,
    dst_cy: f64,
}

impl RotationFrame {
    fn new(width: u32, height: u32, degrees: f64) -> Self {
        let (sin, cos) = sin_cos(degrees);
        let (dst_w, dst_h) = rotated_canvas(width, height, degrees);

        Self {
            sin,
            cos,
            right_angle: degrees % 90.0 == 0.0,
            src_cx: f64::from(width) * 0.5,
            src_cy: f64::from(height) * 0.5,
            dst_w,
            dst_h,
            dst_cx: f64::from(dst_w) * 0.5,
            dst_cy: f64::from(dst_h) * 0.5,
        }
    }

    /// Rotate a math-space point (y up) about the origin.
    #[inline]
    fn turn(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.cos - y * self.sin, x * self.sin + y * self.cos)
    }

    #[inline]
    fn screen_x(&self, x: f64) -> i32 {
        (x + self.dst_cx) as i32
    }

    #[inline]
    fn screen_y(&self, y: f64) -> i32 {
        (self.dst_cy - y) as i32
    }

    fn map_boxes(&self, boxes: &[BoundingBox]) -> Vec<BoundingBox> {
        boxes.iter().map(|b| self.map_box(b)).collect()
    }

    fn map_box(&self, b: &BoundingBox) -> BoundingBox {
        // Relative to the source center, y flipped to point up.
        let x0 = f64::from(b.xmin) - self.src_cx;
        let x1 = f64::from(b.xmax) - self.src_cx;
        let y0 = self.src_cy - f64::from(b.ymin);
        let y1 = self.src_cy - f64::from(b.ymax);

        let (ax, ay) = self.turn(x0, y0);
        let (cx, cy) = self.turn(x1, y1);

        if self.right_angle {
            // The diagonal stays a diagonal; only the corner roles swap.
            return BoundingBox::from_corners(
                self.screen_x(ax),
                self.screen_y(ay),
                self.screen_x(cx),
                self.screen_y(cy),
            );
        }

        let (bx, by) = self.turn(x1, y0);
        let (dx, dy) = self.turn(x0, y1);
        let xs = [ax, bx, cx, dx];
        let ys = [ay, by, cy, dy];
        let min = |v: [f64; 4]| v.into_iter().fold(f64::INFINITY, f64::min);
        let max = |v: [f64; 4]| v.into_iter().fold(f64::NEG_INFINITY, f64::max);

        // Largest math-space y is the smallest screen y.
        BoundingBox::new(
            self.screen_x(min(xs)),
            self.screen_y(max(ys)),
            self.screen_x(max(xs)),
            self.screen_y(min(ys)),
        )
    }

    /// Inverse of the forward pixel transform, as `[a, b, c, d, e, f]`
    /// mapping `(x, y)` to `(a*x + b*y + c, d*x + e*y + f)`.
    fn inverse_affine(&self) -> [f64; 6] {
        let (a, b) = (self.cos, self.sin);
        let (d, e) = (-self.sin, self.cos);
        let c = (1.0 - self.cos) * self.src_cx - self.sin * self.src_cy + (self.dst_cx - self.src_cx);
        let f = self.sin * self.src_cx + (1.0 - self.cos) * self.src_cy + (self.dst_cy - self.src_cy);

        let det = a * e - b * d;
        let (ia, ib) = (e / det, -b / det);
        let (id, ie) = (-d / det, a / det);

        [ia, ib, -(ia * c + ib * f), id, ie, -(id * c + ie * f)]
    }
}

/// Resample `image` onto the frame's canvas, one output row per task.
fn resample(image: &DecodedImage, frame: &RotationFrame, interpolation: Interpolation) -> Vec<u8> {
    let channels = image.channels as usize;
    let row_len = frame.dst_w as usize * channels;
    let mut output = vec![BACKGROUND; row_len * frame.dst_h as usize];

    if row_len == 0 || image.is_empty() {
        return output;
    }

    let inv = frame.inverse_affine();

    output
        .par_chunks_exact_mut(row_len)
        .enumerate()
        .for_each(|(dst_y, row)| {
            let y = dst_y as f64;
            for (dst_x, out) in row.chunks_exact_mut(channels).enumerate() {
                let x = dst_x as f64;
                let src_x = inv[0] * x + inv[1] * y + inv[2];
                let src_y = inv[3] * x + inv[4] * y + inv[5];

                match interpolation {
                    Interpolation::Nearest => sample_nearest(image, src_x, src_y, out),
                    Interpolation::Bilinear => sample_bilinear(image, src_x, src_y, out),
                }
            }
        });

    output
}

fn sample_nearest(image: &DecodedImage, x: f64, y: f64, out: &mut [u8]) {
    match image.pixel(x.round() as i64, y.round() as i64) {
        Some(px) => out.copy_from_slice(px),
        None => out.fill(BACKGROUND),
    }
}

/// Sample a pixel using bilinear interpolation.
///
/// Neighbours outside the source count as [`BACKGROUND`], so edges blend
/// into the fill instead of being cut off.
fn sample_bilinear(image: &DecodedImage, x: f64, y: f64, out: &mut [u8]) {
    let (xf, yf) = (x.floor(), y.floor());
    let (fx, fy) = (x - xf, y - yf);
    let (x0, y0) = (xf as i64, yf as i64);

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ]
    .map(|(px, py, weight)| (image.pixel(px, py), weight));

    for (c, slot) in out.iter_mut().enumerate() {
        let v: f64 = taps
            .iter()
            .map(|(px, weight)| weight * f64::from(px.map_or(BACKGROUND, |p| p[c])))
            .sum();
        *slot = v.clamp(0.0, 255.0).round() as u8;
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
