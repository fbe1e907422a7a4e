//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in the coordinate units of its frame.
///
/// Planetary footprints are stored in planetocentric longitude/latitude
/// degrees, but nothing here assumes a particular reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Degenerate box around a single position.
    pub fn from_point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// Smallest box containing every `[x, y]` position, or `None` when empty.
    pub fn from_positions<'a, I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a [f64; 2]>,
    {
        let mut positions = positions.into_iter();
        let first = positions.next()?;
        let mut bbox = Self::from_point(first[0], first[1]);
        for p in positions {
            bbox.extend_point(p[0], p[1]);
        }
        Some(bbox)
    }

    /// Grow the box so it contains the given position.
    pub fn extend_point(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Component-wise union of two boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Check if `other` lies entirely inside this box (edges included).
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// The `[west, south, east, north]` array used by GeoJSON and STAC.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Build from a `[west, south, east, north]` array.
    pub fn from_array(a: [f64; 4]) -> Self {
        Self::new(a[0], a[1], a[2], a[3])
    }
}
