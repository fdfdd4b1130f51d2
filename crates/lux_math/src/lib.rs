// Re-export glam for convenience
pub use glam::*;

// Lux math types
mod aabb;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::Mat4Ext;

/// Linear RGB color. Components are unbounded radiance values.
pub type Color = DVec3;

/// Linear RGBA color.
pub type ColorRgba = DVec4;

/// Millimetres to metres, for camera sensor and lens quantities.
pub const MM_TO_M: f64 = 0.001;

/// Build a tangent and bitangent completing `n` to a right-handed frame.
///
/// Branchless construction from Duff et al. 2017, "Building an Orthonormal
/// Basis, Revisited". `n` must be unit length.
pub fn orthonormal_basis(n: DVec3) -> (DVec3, DVec3) {
    let sign = 1.0_f64.copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    let tangent = DVec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = DVec3::new(b, sign + n.y * n.y * a, -n.y);

    (tangent, bitangent)
}
