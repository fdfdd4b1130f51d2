use crate::DVec3;

/// A ray in 3D space with an origin and a unit-length direction.
///
/// The direction is normalized on construction, so `t` along the ray is
/// always a world-space distance.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

impl Ray {
    /// Create a ray from an origin and a direction (normalized here).
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Create a ray starting at `from` and passing through `to`.
    pub fn from_points(from: DVec3, to: DVec3) -> Self {
        Self::new(from, to - from)
    }

    /// Get the point along the ray at distance t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Component-wise reciprocal of the direction, for slab tests.
    ///
    /// Zero components become infinities on purpose.
    #[inline]
    pub fn inv_direction(&self) -> DVec3 {
        self.direction.recip()
    }
}
