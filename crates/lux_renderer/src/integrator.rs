//! Unidirectional path tracer.
//!
//! Each bounce adds emission found at the hit (MIS-weighted against light
//! sampling), punctual lights, one area-light sample, and then continues
//! along a BRDF-sampled direction. Russian roulette on the path
//! throughput is the primary terminator; `max_bounces` caps the rest.

use lux_core::{Material, Scene};
use lux_math::{orthonormal_basis, Color, DMat3, DVec3, Interval, Ray};
use rand::Rng;

use crate::hit::RayHitInfo;
use crate::intersect::{intersect_scene, INTERSECTION_TOLERANCE};
use crate::pbr::BrdfInput;
use crate::sampler::{
    balance_heuristic, lobe_pdfs, pdf_light_sample, pick_light_sample, sample_direction,
    tangent_frame, LightSample,
};
use crate::settings::RenderSettings;

/// Distance secondary rays are pushed off the surface along the normal.
pub const SPAWN_OFFSET: f64 = 10.0 * INTERSECTION_TOLERANCE;

/// Relative slack when checking that a shadow ray reached the sampled
/// light point.
const SHADOW_DISTANCE_SLACK: f64 = 1e-4;

/// Traces camera rays through a read-only scene.
///
/// Holds only shared references, so one tracer is shared by every worker.
#[derive(Clone, Copy)]
pub struct PathTracer<'a> {
    scene: &'a Scene,
    light_samples: &'a [LightSample],
    max_bounces: u32,
    near_plane: f64,
    far_plane: f64,
}

/// Shading state at one path vertex.
struct Vertex {
    position: DVec3,
    /// Spawn point for secondary and shadow rays
    origin: DVec3,
    input: BrdfInput,
    reflection_probability: f64,
}

impl<'a> PathTracer<'a> {
    /// Hit distances are bounded by the scene camera's clip planes unless
    /// `settings` overrides them.
    pub fn new(scene: &'a Scene, light_samples: &'a [LightSample], settings: &RenderSettings) -> Self {
        let (near_plane, far_plane) = settings.clip_planes(scene.camera.as_ref());
        Self {
            scene,
            light_samples,
            max_bounces: settings.max_bounces,
            near_plane,
            far_plane,
        }
    }

    /// Radiance arriving along `ray` toward its origin.
    ///
    /// Non-finite estimates are dropped and returned as black.
    pub fn trace<R: Rng + ?Sized>(&self, ray: &Ray, rng: &mut R) -> Color {
        let mut radiance = Color::ZERO;
        let mut throughput = Color::ONE;
        let mut ray = *ray;
        // Mixture density of the BRDF sample that produced `ray`; None for
        // camera rays
        let mut bsdf_pdf: Option<f64> = None;
        let mut depth = 0u32;

        loop {
            let hit = intersect_scene(&ray, self.scene);

            let valid = if depth == 0 {
                Interval::new(self.near_plane, self.far_plane)
            } else {
                Interval::new(0.0, self.far_plane)
            };
            let material = match hit.material {
                Some(material) if hit.is_hit() && valid.excludes_min_contains(hit.distance) => material,
                _ => {
                    radiance += throughput * self.scene.skybox.color(ray.direction);
                    break;
                }
            };

            if hit.is_emissive() {
                let weight = match bsdf_pdf {
                    None => 1.0,
                    Some(pdf) => {
                        let pdf_light = pdf_light_sample(self.light_samples.len(), &hit, ray.direction);
                        balance_heuristic(pdf, &[pdf, pdf_light])
                    }
                };
                radiance += throughput * hit.emitted * weight;
            }

            let survival = throughput.max_element().min(1.0);
            if !survival.is_finite() || rng.gen::<f64>() >= survival {
                break;
            }

            let vertex = shading_vertex(&hit, material, ray.direction);
            // No BRDF sample leaves the last vertex, so its light sample
            // stands alone
            let last_vertex = depth >= self.max_bounces;

            let direct = self.punctual_lighting(&vertex) + self.area_lighting(&vertex, last_vertex, rng);
            radiance += throughput * direct / survival;

            if last_vertex {
                break;
            }

            let frame = shading_frame(&hit, vertex.input.normal);
            let sample = sample_direction(&vertex.input, &frame, vertex.reflection_probability, rng);
            let cos_theta = vertex.input.normal.dot(sample.direction);
            if sample.pdf <= 0.0 || cos_theta <= 0.0 {
                break;
            }

            let mixture = lobe_pdfs(&vertex.input, vertex.reflection_probability, sample.direction).total();
            if mixture <= 0.0 {
                break;
            }

            let brdf = vertex.input.evaluate(sample.direction);
            throughput *= brdf * cos_theta / mixture / survival;
            bsdf_pdf = Some(mixture);
            ray = Ray::new(vertex.origin, sample.direction);
            depth += 1;
        }

        if radiance.is_finite() {
            radiance
        } else {
            Color::ZERO
        }
    }

    /// Shadow-tested contribution of every point, spot and directional
    /// light.
    fn punctual_lighting(&self, vertex: &Vertex) -> Color {
        let normal = vertex.input.normal;
        let mut total = Color::ZERO;

        for light in &self.scene.lights {
            let to_light = light.direction_from_point(vertex.position);
            if to_light.dot(normal) <= 0.0 {
                continue;
            }

            let distance = light.distance_from_point(vertex.origin);
            let blocker = intersect_scene(&Ray::new(vertex.origin, to_light), self.scene);
            if blocker.is_hit() && blocker.distance < distance {
                continue;
            }

            total += vertex.input.evaluate(to_light)
                * std::f64::consts::PI
                * light.light_factor(vertex.position, normal);
        }

        total
    }

    /// One sample of the emissive triangles, MIS-weighted against the BRDF
    /// sample unless `unweighted` is set.
    fn area_lighting<R: Rng + ?Sized>(&self, vertex: &Vertex, unweighted: bool, rng: &mut R) -> Color {
        let Some(light) = pick_light_sample(self.light_samples, rng) else {
            return Color::ZERO;
        };

        let offset = light.random_sample(rng) - vertex.origin;
        let distance = offset.length();
        if distance <= 0.0 {
            return Color::ZERO;
        }
        let direction = offset / distance;

        let normal = vertex.input.normal;
        let cos_theta = normal.dot(direction);
        if cos_theta <= 0.0 {
            return Color::ZERO;
        }

        let shadow = intersect_scene(&Ray::new(vertex.origin, direction), self.scene);
        let reached = shadow.distance + SHADOW_DISTANCE_SLACK * distance.max(1.0) >= distance;
        if !shadow.is_hit() || !shadow.is_emissive() || !reached {
            return Color::ZERO;
        }

        let pdf_light = pdf_light_sample(self.light_samples.len(), &shadow, direction);
        if pdf_light <= 0.0 {
            return Color::ZERO;
        }

        let weight = if unweighted {
            1.0
        } else {
            let pdfs = lobe_pdfs(&vertex.input, vertex.reflection_probability, direction);
            balance_heuristic(pdf_light, &[pdfs.diffuse, pdfs.specular, pdf_light])
        };

        vertex.input.evaluate(direction) * shadow.emitted * cos_theta / pdf_light * weight
    }
}

/// Material inputs at the hit, with the normal facing the incoming ray.
fn shading_vertex(hit: &RayHitInfo, material: &Material, direction: DVec3) -> Vertex {
    let incoming = -direction;
    let normal = if hit.normal.dot(incoming) < 0.0 {
        -hit.normal
    } else {
        hit.normal
    };

    let input = BrdfInput::new(
        incoming,
        normal,
        material.diffuse(hit.uv),
        material.roughness(hit.uv),
        material.metalness(hit.uv),
    );

    Vertex {
        position: hit.position,
        origin: hit.position + normal * SPAWN_OFFSET,
        reflection_probability: input.reflection_probability(),
        input,
    }
}

/// Orthonormal (tangent, bitangent, normal) frame around `normal`, keeping
/// the surface tangent direction where possible.
fn shading_frame(hit: &RayHitInfo, normal: DVec3) -> DMat3 {
    let tangent = (hit.tangent - normal * normal.dot(hit.tangent))
        .try_normalize()
        .unwrap_or_else(|| orthonormal_basis(normal).0);
    let bitangent = normal.cross(tangent);
    tangent_frame(tangent, bitangent, normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use lux_core::{Camera, Light, Mesh, Object, Skybox, Transform};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::sampler::collect_light_samples;

    fn settings(max_bounces: u32) -> RenderSettings {
        RenderSettings {
            max_bounces,
            ..Default::default()
        }
    }

    fn quad_scene(material: Material, sky: Color) -> Scene {
        let mut scene = Scene::new();
        scene.add_object(Object::new(
            "quad",
            Arc::new(Mesh::quad(2.0, 2.0)),
            Arc::new(material),
            Transform::default(),
        ));
        scene.set_skybox(Skybox::solid(sky));
        scene
    }

    fn matte(albedo: f64) -> Material {
        Material::new("matte", Color::splat(albedo)).with_roughness(1.0)
    }

    #[test]
    fn test_miss_returns_skybox() {
        let mut scene = Scene::new();
        scene.set_skybox(Skybox::solid(Color::new(0.2, 0.3, 0.4)));
        let tracer = PathTracer::new(&scene, &[], &settings(5));
        let mut rng = StdRng::seed_from_u64(1);

        let color = tracer.trace(&Ray::new(DVec3::ZERO, DVec3::Y), &mut rng);
        assert!((color - Color::new(0.2, 0.3, 0.4)).length() < 1e-12);
    }

    #[test]
    fn test_direct_view_of_emitter() {
        let emitter = Material::emitter("lamp", Color::new(1.0, 0.5, 0.25), 2.0);
        let scene = quad_scene(emitter, Color::ZERO);
        let lights = collect_light_samples(&scene);
        let tracer = PathTracer::new(&scene, &lights, &settings(5));
        let mut rng = StdRng::seed_from_u64(2);

        for _ in 0..16 {
            let color = tracer.trace(&Ray::new(DVec3::new(0.1, -0.2, 3.0), -DVec3::Z), &mut rng);
            assert!((color - Color::new(2.0, 1.0, 0.5)).length() < 1e-12, "color was {color}");
        }
    }

    #[test]
    fn test_directional_light_on_lambertian() {
        let mut scene = quad_scene(matte(0.5), Color::ZERO);
        scene.add_light(Light::directional(-DVec3::Z, Color::ONE, 1.0));
        let tracer = PathTracer::new(&scene, &[], &settings(0));
        let mut rng = StdRng::seed_from_u64(3);

        let color = tracer.trace(&Ray::new(DVec3::new(0.0, 0.0, 2.0), -DVec3::Z), &mut rng);
        // k_d * albedo + k_s * D * G * pi / 4 with k_s = 0.04, D = 1/pi, G = 1
        let expected = 0.96 * 0.5 + 0.04 / 4.0;
        assert!((color.x - expected).abs() < 1e-9, "color was {color}");
        assert!((color.y - color.x).abs() < 1e-12);
    }

    #[test]
    fn test_back_side_is_shaded_with_flipped_normal() {
        let mut scene = quad_scene(matte(0.5), Color::ZERO);
        scene.add_light(Light::directional(DVec3::Z, Color::ONE, 1.0));
        let tracer = PathTracer::new(&scene, &[], &settings(0));
        let mut rng = StdRng::seed_from_u64(4);

        let color = tracer.trace(&Ray::new(DVec3::new(0.0, 0.0, -2.0), DVec3::Z), &mut rng);
        assert!((color.x - 0.49).abs() < 1e-9, "color was {color}");
    }

    #[test]
    fn test_occluded_light_contributes_nothing() {
        let mut scene = quad_scene(matte(0.5), Color::ZERO);
        let blocker = Transform::from_translation(DVec3::new(0.0, 0.0, 1.0));
        scene.add_object(Object::new(
            "blocker",
            Arc::new(Mesh::quad(4.0, 4.0)),
            Arc::new(matte(0.5)),
            blocker,
        ));
        scene.add_light(Light::point(DVec3::new(0.0, 0.0, 3.0), Color::ONE, 10.0));
        let tracer = PathTracer::new(&scene, &[], &settings(0));
        let mut rng = StdRng::seed_from_u64(5);

        // Start between the two quads, looking down
        let color = tracer.trace(&Ray::new(DVec3::new(0.0, 0.0, 0.5), -DVec3::Z), &mut rng);
        assert_eq!(color, Color::ZERO);
    }

    #[test]
    fn test_near_and_far_planes_apply() {
        let sky = Color::new(0.1, 0.2, 0.3);
        let scene = quad_scene(matte(0.5), sky);
        let mut rng = StdRng::seed_from_u64(6);

        // Closer than the near plane
        let tracer = PathTracer::new(&scene, &[], &settings(0));
        let color = tracer.trace(&Ray::new(DVec3::new(0.0, 0.0, 0.05), -DVec3::Z), &mut rng);
        assert!((color - sky).length() < 1e-12);

        // Beyond the far plane
        let mut far = settings(0);
        far.set_far_plane(Some(1.0));
        let tracer = PathTracer::new(&scene, &[], &far);
        let color = tracer.trace(&Ray::new(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z), &mut rng);
        assert!((color - sky).length() < 1e-12);
    }

    #[test]
    fn test_camera_far_plane_bounds_hits() {
        let sky = Color::new(0.1, 0.2, 0.3);
        let mut scene = quad_scene(matte(0.5), sky);
        scene.set_camera(Camera::new().with_clip_planes(0.1, 2.0));
        let mut rng = StdRng::seed_from_u64(10);
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z);

        let tracer = PathTracer::new(&scene, &[], &settings(0));
        assert!((tracer.trace(&ray, &mut rng) - sky).length() < 1e-12);

        // The settings override reaches the quad again
        let mut far = settings(0);
        far.set_far_plane(Some(10.0));
        let tracer = PathTracer::new(&scene, &[], &far);
        assert!((tracer.trace(&ray, &mut rng) - sky).length() > 0.1);
    }

    #[test]
    fn test_zero_bounces_ignores_sky_lighting() {
        let scene = quad_scene(matte(0.8), Color::ONE);
        let tracer = PathTracer::new(&scene, &[], &settings(0));
        let mut rng = StdRng::seed_from_u64(7);

        let color = tracer.trace(&Ray::new(DVec3::new(0.0, 0.0, 1.0), -DVec3::Z), &mut rng);
        assert_eq!(color, Color::ZERO);
    }

    #[test]
    fn test_white_furnace_converges() {
        // Upward-facing white diffuse quad under a uniform sky. One bounce
        // sees the sky, so the expected radiance is the directional albedo.
        let material = Material::new("white", Color::ONE).with_roughness(1.0);
        let scene = quad_scene(material, Color::ONE);
        let tracer = PathTracer::new(&scene, &[], &settings(1));
        let mut rng = StdRng::seed_from_u64(8);

        let samples = 20_000;
        let mut sum = Color::ZERO;
        for _ in 0..samples {
            sum += tracer.trace(&Ray::new(DVec3::new(0.0, 0.0, 1.0), -DVec3::Z), &mut rng);
        }
        let mean = sum / samples as f64;
        assert!(mean.x > 0.9 && mean.x < 1.05, "mean was {mean}");
    }

    /// Matte floor under a 0.5 x 0.5 lamp facing down from z = 1.
    fn lamp_scene(radiance: f64) -> Scene {
        let mut scene = quad_scene(matte(0.5), Color::ZERO);
        let lamp = Transform::from_euler_degrees(
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(180.0, 0.0, 0.0),
            DVec3::ONE,
        );
        scene.add_object(Object::new(
            "lamp",
            Arc::new(Mesh::quad(0.5, 0.5)),
            Arc::new(Material::emitter("lamp", Color::ONE, radiance)),
            lamp,
        ));
        scene
    }

    /// Radiance reflected toward +Z at `point` from the lamp of
    /// [`lamp_scene`], by midpoint quadrature over the lamp.
    fn lamp_reference(input: &BrdfInput, point: DVec3, radiance: f64) -> f64 {
        let steps = 200;
        let cell = 0.5 / steps as f64;
        let mut total = 0.0;
        for i in 0..steps {
            for j in 0..steps {
                let x = -0.25 + (i as f64 + 0.5) * cell;
                let y = -0.25 + (j as f64 + 0.5) * cell;
                let offset = DVec3::new(x, y, 1.0) - point;
                let distance_squared = offset.length_squared();
                let direction = offset / distance_squared.sqrt();
                // Both the floor and the lamp see each other at direction.z
                let cos = direction.z;
                total += input.evaluate(direction).x * radiance * cos * cos / distance_squared;
            }
        }
        total * cell * cell
    }

    fn mean_radiance(tracer: &PathTracer, ray: &Ray, samples: usize, seed: u64) -> Color {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sum = Color::ZERO;
        for _ in 0..samples {
            sum += tracer.trace(ray, &mut rng);
        }
        sum / samples as f64
    }

    #[test]
    fn test_area_light_matches_quadrature() {
        let radiance = 5.0;
        let scene = lamp_scene(radiance);
        let lights = collect_light_samples(&scene);
        let ray = Ray::new(DVec3::new(0.6, 0.0, 0.5), -DVec3::Z);

        let input = BrdfInput::new(DVec3::Z, DVec3::Z, Color::splat(0.5), 1.0, 0.0);
        let expected = lamp_reference(&input, DVec3::new(0.6, 0.0, 0.0), radiance);

        let tracer = PathTracer::new(&scene, &lights, &settings(0));
        let mean = mean_radiance(&tracer, &ray, 4000, 9);
        assert!(
            (mean.x - expected).abs() < 0.03 * expected,
            "mean {mean}, expected {expected}"
        );
    }

    #[test]
    fn test_bounce_cap_keeps_full_direct_light() {
        // The lamp reflects nothing back, so one extra bounce can only move
        // light between the two strategies, never add or remove it
        let scene = lamp_scene(5.0);
        let lights = collect_light_samples(&scene);
        let ray = Ray::new(DVec3::new(0.3, 0.2, 0.5), -DVec3::Z);

        let capped = PathTracer::new(&scene, &lights, &settings(0));
        let deeper = PathTracer::new(&scene, &lights, &settings(1));
        let capped_mean = mean_radiance(&capped, &ray, 8000, 12);
        let deeper_mean = mean_radiance(&deeper, &ray, 8000, 13);

        assert!(capped_mean.x > 0.0);
        assert!(
            (capped_mean.x - deeper_mean.x).abs() < 0.03 * deeper_mean.x,
            "capped {capped_mean} vs one more bounce {deeper_mean}"
        );
    }
}
