/// A range of ray distances, `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true if x is within the half-open interval (min, max].
    ///
    /// This is the acceptance test for hit distances: a hit exactly at the
    /// origin is rejected, a hit exactly on the far plane is kept.
    pub fn excludes_min_contains(&self, x: f64) -> bool {
        self.min < x && x <= self.max
    }
}
