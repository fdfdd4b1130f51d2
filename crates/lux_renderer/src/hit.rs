use lux_core::Material;
use lux_math::{Color, DVec2, DVec3};

/// Result of a nearest-hit query.
///
/// `distance == f64::MAX` means nothing was hit. The material reference
/// borrows from the scene and never outlives the query's caller.
#[derive(Clone, Copy, Debug)]
pub struct RayHitInfo<'a> {
    pub distance: f64,
    pub position: DVec3,
    pub normal: DVec3,
    pub tangent: DVec3,
    pub bitangent: DVec3,
    pub uv: DVec2,
    /// Weights of the triangle's three vertices
    pub barycentric: DVec3,
    /// World-space area of the hit triangle
    pub area: f64,
    pub material: Option<&'a Material>,
    /// Emissive color times emissive intensity at the hit
    pub emitted: Color,
}

impl Default for RayHitInfo<'_> {
    fn default() -> Self {
        Self {
            distance: f64::MAX,
            position: DVec3::ZERO,
            normal: DVec3::Z,
            tangent: DVec3::X,
            bitangent: DVec3::Y,
            uv: DVec2::ZERO,
            barycentric: DVec3::ZERO,
            area: 0.0,
            material: None,
            emitted: Color::ZERO,
        }
    }
}

impl RayHitInfo<'_> {
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.distance < f64::MAX
    }

    #[inline]
    pub fn is_emissive(&self) -> bool {
        self.emitted.max_element() > 0.0
    }
}
