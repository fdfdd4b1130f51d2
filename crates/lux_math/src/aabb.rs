use crate::{DVec3, Interval, Ray};

/// Axis-Aligned Bounding Box for the BVH.
///
/// Stored as two corners. An empty box has `min > max` on every axis so that
/// `union` with it is the identity.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Create an AABB from its two corners, as given.
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Create an empty AABB (contains nothing).
    pub fn empty() -> Self {
        Self::EMPTY
    }

    /// Create an AABB from two arbitrary corner points.
    pub fn from_points(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Smallest box containing every point of the iterator.
    pub fn from_iter_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |acc, p| Self::new(acc.min.min(p), acc.max.max(p)))
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow the box by `epsilon` on every side.
    pub fn inflate(&self, epsilon: f64) -> Aabb {
        Aabb {
            min: self.min - DVec3::splat(epsilon),
            max: self.max + DVec3::splat(epsilon),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Returns the center point of the bounding box.
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Size of the box along each axis.
    pub fn extent(&self) -> DVec3 {
        self.max - self.min
    }

    /// Returns true if the point lies inside or on the box.
    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Slab test against a ray given its origin and precomputed inverse direction.
    ///
    /// Returns the `[entry, exit]` distances, or `None` on a miss. Axis-aligned
    /// rays produce infinite inverse components; IEEE arithmetic makes the
    /// slabs on those axes either all-accepting or all-rejecting.
    pub fn intersect(&self, origin: DVec3, inv_direction: DVec3) -> Option<Interval> {
        let t0 = (self.min - origin) * inv_direction;
        let t1 = (self.max - origin) * inv_direction;

        let entry = t0.min(t1).max_element();
        let exit = t0.max(t1).min_element();

        if entry > exit || exit < 0.0 {
            return None;
        }
        Some(Interval::new(entry, exit))
    }

    /// Convenience wrapper around [`Aabb::intersect`] for a [`Ray`].
    pub fn hit(&self, ray: &Ray) -> Option<Interval> {
        self.intersect(ray.origin, ray.inv_direction())
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the largest extent.
    ///
    /// Y wins only when strictly larger than both others, then Z when
    /// strictly larger than X, otherwise X. BVH layouts depend on this
    /// exact tie-break.
    pub fn largest_axis(&self) -> usize {
        largest_axis(self.extent())
    }

    /// Static constants
    pub const EMPTY: Aabb = Aabb {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };
}

/// Axis of greatest extent with the y > z > x priority on ties.
pub fn largest_axis(extent: DVec3) -> usize {
    if extent.y > extent.x && extent.y > extent.z {
        1
    } else if extent.z > extent.x {
        2
    } else {
        0
    }
}
