//! Direction sampling, probability densities and MIS weights.
//!
//! Every sampling routine here has a matching density function. Densities
//! must be evaluated with the same lobe probability used for sampling.

use std::f64::consts::{FRAC_1_PI, PI};

use lux_core::Scene;
use lux_math::{Color, DMat3, DVec2, DVec3};
use rand::Rng;

use crate::hit::RayHitInfo;
use crate::pbr::{distribution_ggx, half_vector, BrdfInput};

/// Guard for cosines that end up in a denominator.
const MIN_COSINE: f64 = 1e-6;

/// A world-space emissive triangle that can be sampled for direct light.
#[derive(Debug, Clone, PartialEq)]
pub struct LightSample {
    pub vertices: [DVec3; 3],
    pub area: f64,
    pub radiance: Color,
}

impl LightSample {
    pub fn new(vertices: [DVec3; 3], radiance: Color) -> Self {
        let [p0, p1, p2] = vertices;
        Self {
            vertices,
            area: 0.5 * (p1 - p0).cross(p2 - p0).length(),
            radiance,
        }
    }

    /// Uniformly distributed point on the triangle.
    pub fn random_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVec3 {
        let mut u: f64 = rng.gen();
        let mut v: f64 = rng.gen();
        // Fold the upper half of the unit square back onto the triangle
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        let [p0, p1, p2] = self.vertices;
        p0 + (p1 - p0) * u + (p2 - p0) * v
    }
}

/// Gather every emissive triangle of the scene in world space.
pub fn collect_light_samples(scene: &Scene) -> Vec<LightSample> {
    let mut samples = Vec::new();

    for object in scene.objects.iter().filter(|o| o.material.is_emissive()) {
        let mesh = &object.mesh;
        let matrix = object.matrix();

        for (face_index, face) in mesh.faces.iter().enumerate() {
            let centroid_uv = face
                .iter()
                .map(|&i| mesh.uvs[i as usize])
                .fold(DVec2::ZERO, |acc, uv| acc + uv)
                / 3.0;
            let radiance = object.material.emissive(centroid_uv)
                * object.material.emissive_intensity(centroid_uv);
            if radiance.max_element() <= 0.0 {
                continue;
            }

            let vertices = mesh.triangle(face_index).map(|p| matrix.transform_point3(p));
            let sample = LightSample::new(vertices, radiance);
            if sample.area > 0.0 {
                samples.push(sample);
            }
        }
    }

    log::debug!("Collected {} emissive triangles", samples.len());
    samples
}

/// Pick one light sample uniformly.
pub fn pick_light_sample<'a, R: Rng + ?Sized>(
    samples: &'a [LightSample],
    rng: &mut R,
) -> Option<&'a LightSample> {
    if samples.is_empty() {
        return None;
    }
    samples.get(rng.gen_range(0..samples.len()))
}

/// Tangent frame as matrix columns (tangent, bitangent, normal).
pub fn tangent_frame(tangent: DVec3, bitangent: DVec3, normal: DVec3) -> DMat3 {
    DMat3::from_cols(tangent, bitangent, normal)
}

/// Cosine-weighted direction about the frame's normal.
pub fn sample_cosine_hemisphere<R: Rng + ?Sized>(frame: &DMat3, rng: &mut R) -> DVec3 {
    let r1: f64 = rng.gen();
    let r2: f64 = rng.gen();

    let r = r1.sqrt();
    let phi = 2.0 * PI * r2;
    let local = DVec3::new(r * phi.cos(), r * phi.sin(), (1.0 - r1).max(0.0).sqrt());

    *frame * local
}

/// Density of [`sample_cosine_hemisphere`], scaled by the lobe
/// probability.
pub fn pdf_cosine_hemisphere(probability: f64, normal: DVec3, direction: DVec3) -> f64 {
    probability * normal.dot(direction).max(0.0) * FRAC_1_PI
}

/// GGX-distributed half vector about the frame's normal.
pub fn sample_half_vector_ggx<R: Rng + ?Sized>(roughness: f64, frame: &DMat3, rng: &mut R) -> DVec3 {
    let alpha = roughness * roughness;
    let u1: f64 = rng.gen();
    let u2: f64 = rng.gen();

    let theta = (alpha * (u1 / (1.0 - u1)).sqrt()).atan();
    let phi = 2.0 * PI * u2;

    let sin_theta = theta.sin();
    let local = DVec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), theta.cos());

    *frame * local
}

/// Density of reflecting `incoming` about a GGX half vector, per solid
/// angle of the reflected direction, scaled by the lobe probability.
///
/// The half vector is drawn with density `D(h) * cos(theta_h)`; the
/// reflection Jacobian is `1 / (4 * dot(incoming, h))`.
pub fn pdf_half_vector_ggx(
    probability: f64,
    roughness: f64,
    incoming: DVec3,
    normal: DVec3,
    half: DVec3,
) -> f64 {
    let d = distribution_ggx(normal, half, roughness);
    let cos_h = normal.dot(half).max(0.0);
    probability * d * cos_h / (4.0 * incoming.dot(half).max(MIN_COSINE))
}

/// Solid-angle density of reaching `hit` by picking one of `light_count`
/// emissive triangles uniformly and then a uniform point on it.
///
/// Emitters are two-sided, so the cosine at the light is taken unsigned.
pub fn pdf_light_sample(light_count: usize, hit: &RayHitInfo, direction: DVec3) -> f64 {
    if light_count == 0 || hit.area <= 0.0 {
        return 0.0;
    }
    let cos_light = direction.dot(-hit.normal).abs().max(MIN_COSINE);
    hit.distance * hit.distance / (light_count as f64 * cos_light * hit.area)
}

/// `pdf_chosen / sum(pdfs)`, or zero when every density is zero.
pub fn balance_heuristic(pdf_chosen: f64, pdfs: &[f64]) -> f64 {
    let sum: f64 = pdfs.iter().sum();
    if sum > 0.0 {
        pdf_chosen / sum
    } else {
        0.0
    }
}

/// Like [`balance_heuristic`] with every density squared.
pub fn power_heuristic(pdf_chosen: f64, pdfs: &[f64]) -> f64 {
    let sum: f64 = pdfs.iter().map(|p| p * p).sum();
    if sum > 0.0 {
        pdf_chosen * pdf_chosen / sum
    } else {
        0.0
    }
}

/// Mirror `direction` about `normal`.
#[inline]
pub fn reflect(direction: DVec3, normal: DVec3) -> DVec3 {
    direction - normal * 2.0 * direction.dot(normal)
}

/// Densities of both BRDF lobes for one outgoing direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LobePdfs {
    pub diffuse: f64,
    pub specular: f64,
}

impl LobePdfs {
    /// Density of the lobe mixture.
    #[inline]
    pub fn total(&self) -> f64 {
        self.diffuse + self.specular
    }
}

/// Evaluate both lobe densities for `outgoing`, weighted by the same
/// reflection probability used for sampling.
pub fn lobe_pdfs(input: &BrdfInput, reflection_probability: f64, outgoing: DVec3) -> LobePdfs {
    let half = half_vector(input.incoming, outgoing, input.normal);
    LobePdfs {
        diffuse: pdf_cosine_hemisphere(1.0 - reflection_probability, input.normal, outgoing),
        specular: pdf_half_vector_ggx(
            reflection_probability,
            input.roughness,
            input.incoming,
            input.normal,
            half,
        ),
    }
}

/// A BRDF-sampled direction with the density of the lobe that chose it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionSample {
    pub direction: DVec3,
    pub pdf: f64,
    pub specular: bool,
}

/// Choose a lobe with `reflection_probability` and sample it.
pub fn sample_direction<R: Rng + ?Sized>(
    input: &BrdfInput,
    frame: &DMat3,
    reflection_probability: f64,
    rng: &mut R,
) -> DirectionSample {
    if rng.gen::<f64>() < reflection_probability {
        let half = sample_half_vector_ggx(input.roughness, frame, rng);
        let direction = reflect(-input.incoming, half);
        let pdf = pdf_half_vector_ggx(
            reflection_probability,
            input.roughness,
            input.incoming,
            input.normal,
            half_vector(input.incoming, direction, half),
        );
        DirectionSample {
            direction,
            pdf,
            specular: true,
        }
    } else {
        let direction = sample_cosine_hemisphere(frame, rng);
        DirectionSample {
            direction,
            pdf: pdf_cosine_hemisphere(1.0 - reflection_probability, input.normal, direction),
            specular: false,
        }
    }
}
