//! Cook-Torrance microfacet BRDF.
//!
//! GGX normal distribution, separable Smith geometry and Schlick Fresnel
//! over a Lambertian base, using the metal/roughness parameterization.
//! All directions point away from the surface.

use std::f64::consts::{FRAC_1_PI, PI};

use lux_math::{Color, DVec3};

/// Reflectance at normal incidence of non-metals.
pub const DIELECTRIC_REFLECTANCE: f64 = 0.04;

/// Floor on `alpha` so mirror-like surfaces do not divide by zero.
const MIN_ALPHA: f64 = 1e-6;

/// Surface state needed to evaluate the BRDF at one hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrdfInput {
    /// Unit vector from the hit toward where the ray came from
    pub incoming: DVec3,
    pub normal: DVec3,
    pub base_color: Color,
    pub roughness: f64,
    pub metalness: f64,
}

impl BrdfInput {
    pub fn new(
        incoming: DVec3,
        normal: DVec3,
        base_color: Color,
        roughness: f64,
        metalness: f64,
    ) -> Self {
        Self {
            incoming,
            normal,
            base_color,
            roughness: roughness.clamp(0.0, 1.0),
            metalness: metalness.clamp(0.0, 1.0),
        }
    }

    pub fn base_reflectance(&self) -> Color {
        base_reflectance(self.base_color, self.metalness)
    }

    /// Probability of choosing the specular lobe when sampling.
    ///
    /// Metals always reflect; dielectrics reflect with their average
    /// Fresnel at the current view angle.
    pub fn reflection_probability(&self) -> f64 {
        let f = fresnel_schlick(self.normal, self.incoming, self.base_reflectance());
        let average = (f.x + f.y + f.z) / 3.0;
        (self.metalness + (1.0 - self.metalness) * average).clamp(0.0, 1.0)
    }

    /// BRDF value for light leaving toward `incoming` after arriving
    /// from `outgoing`.
    pub fn evaluate(&self, outgoing: DVec3) -> Color {
        let half = half_vector(self.incoming, outgoing, self.normal);

        let k_s = fresnel_schlick(half, self.incoming, self.base_reflectance());
        let k_d = (Color::ONE - k_s) * (1.0 - self.metalness);

        let specular = cook_torrance_specular(self.incoming, outgoing, self.normal, self.roughness);
        k_d * lambertian_diffuse(self.base_color) + k_s * specular
    }
}

/// Normalized bisector of two directions; `fallback` when they cancel.
#[inline]
pub fn half_vector(a: DVec3, b: DVec3, fallback: DVec3) -> DVec3 {
    (a + b).try_normalize().unwrap_or(fallback)
}

#[inline]
pub fn lambertian_diffuse(color: Color) -> Color {
    color * FRAC_1_PI
}

/// F0: 0.04 for dielectrics, the base color for metals.
#[inline]
pub fn base_reflectance(albedo: Color, metalness: f64) -> Color {
    Color::splat(DIELECTRIC_REFLECTANCE) * (1.0 - metalness) + albedo * metalness
}

/// (1 - cos_theta)^5
#[inline]
fn schlick_weight(cos_theta: f64) -> f64 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x
}

pub fn fresnel_schlick(half: DVec3, view: DVec3, f0: Color) -> Color {
    let cos_theta = view.dot(half).max(0.0);
    f0 + (Color::ONE - f0) * schlick_weight(cos_theta)
}

/// GGX (Trowbridge-Reitz) normal distribution, `alpha = roughness^2`.
pub fn distribution_ggx(normal: DVec3, half: DVec3, roughness: f64) -> f64 {
    let alpha = (roughness * roughness).max(MIN_ALPHA);
    let a2 = alpha * alpha;
    let cos_theta = normal.dot(half).max(0.0);
    let denom = cos_theta * cos_theta * (a2 - 1.0) + 1.0;
    a2 / (PI * denom * denom)
}

/// Smith geometry term as the product of one Schlick-GGX factor per
/// direction.
pub fn geometry_smith(normal: DVec3, view: DVec3, light: DVec3, roughness: f64) -> f64 {
    let alpha = roughness * roughness;
    let a2 = alpha * alpha;

    let g1 = |n_dot: f64| {
        let denom = n_dot * (1.0 - a2) + a2;
        if denom > 0.0 {
            n_dot / denom
        } else {
            0.0
        }
    };

    g1(normal.dot(view).max(0.0)) * g1(normal.dot(light).max(0.0))
}

/// `D * G / (4 cos_l cos_v)`, zero below either horizon.
pub fn cook_torrance_specular(incoming: DVec3, outgoing: DVec3, normal: DVec3, roughness: f64) -> f64 {
    let cos_l = normal.dot(outgoing);
    let cos_v = normal.dot(incoming);
    if cos_l <= 0.0 || cos_v <= 0.0 {
        return 0.0;
    }

    let half = half_vector(incoming, outgoing, normal);
    let d = distribution_ggx(normal, half, roughness);
    let g = geometry_smith(normal, incoming, outgoing, roughness);

    d * g / (4.0 * cos_l * cos_v)
}
