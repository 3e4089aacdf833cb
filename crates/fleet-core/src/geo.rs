//! Planar coordinate type.
//!
//! Map coordinates are abstract grid units, not WGS-84, so distance is plain
//! Euclidean.  `f64` keeps accumulated journey distances stable over long
//! runs.

/// A point on the map plane.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(self, other: Point2) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Point `t` of the way from `self` to `other` (`t` clamped to [0, 1]).
    pub fn lerp(self, other: Point2, t: f64) -> Point2 {
        let t = t.clamp(0.0, 1.0);
        Point2 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl std::fmt::Display for Point2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}
