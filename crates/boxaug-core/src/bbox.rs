//! Axis-aligned bounding boxes in pixel coordinates.
//!
//! Origin is the top-left corner, x grows rightward and y grows downward.
//! Box sequences are positionally paired with an external label list, so
//! every operation in this crate preserves their order and length.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle given by its min/max pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl BoundingBox {
    /// Create a box from its four coordinates, taken as given.
    pub fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Create a box from two opposite corners in any order.
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            xmin: x0.min(x1),
            ymin: y0.min(y1),
            xmax: x0.max(x1),
            ymax: y0.max(y1),
        }
    }

    /// Horizontal extent (negative for malformed boxes).
    #[inline]
    pub fn width(&self) -> i32 {
        self.xmax - self.xmin
    }

    /// Vertical extent (negative for malformed boxes).
    #[inline]
    pub fn height(&self) -> i32 {
        self.ymax - self.ymin
    }

    /// True when `xmin <= xmax` and `ymin <= ymax`.
    ///
    /// Zero-area boxes are well formed.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }

    /// True when every coordinate lies inside `[0, width] x [0, height]`.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let (w, h) = (i64::from(width), i64::from(height));
        let inside = |v: i32, limit: i64| (0..=limit).contains(&i64::from(v));
        inside(self.xmin, w) && inside(self.xmax, w) && inside(self.ymin, h) && inside(self.ymax, h)
    }

    /// Coordinates as an `[xmin, ymin, xmax, ymax]` array.
    pub fn to_array(self) -> [i32; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}
