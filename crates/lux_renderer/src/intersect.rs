//! Ray/geometry intersection.
//!
//! Queries compose bottom-up: triangle (Möller-Trumbore) and box (slab)
//! tests, BVH traversal producing candidates, nearest hit over a mesh in
//! object space, one object with its transform, and finally the whole
//! scene followed by normal mapping.

use lux_core::{Bvh, Material, Mesh, Object, Scene};
use lux_math::{DMat3, DVec3, Ray};

use crate::hit::RayHitInfo;

/// Determinant and distance tolerance for triangle tests.
pub const INTERSECTION_TOLERANCE: f64 = 1e-6;

/// Hit on a single triangle, in the ray's own space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub distance: f64,
    /// Weights of (p0, p1, p2): `(1 - u - v, u, v)`
    pub barycentric: DVec3,
}

/// Nearest triangle of a mesh hit by an object-space ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    pub face: usize,
    pub distance: f64,
    pub barycentric: DVec3,
}

/// Möller-Trumbore ray-triangle intersection.
///
/// Barycentrics are admitted within a small tolerance outside the
/// triangle so rays through shared edges cannot slip between two faces.
pub fn intersect_triangle(ray: &Ray, vertices: &[DVec3; 3]) -> Option<TriangleHit> {
    const TOL: f64 = INTERSECTION_TOLERANCE;

    let [p0, p1, p2] = *vertices;
    let edge1 = p1 - p0;
    let edge2 = p2 - p0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle, or the triangle is degenerate
    if a.abs() < TOL {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - p0;
    let u = f * s.dot(h);

    if !(-TOL..=1.0 + TOL).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);

    if v < -TOL || u + v > 1.0 + TOL {
        return None;
    }

    let t = f * edge2.dot(q);
    if t <= TOL {
        return None;
    }

    Some(TriangleHit {
        distance: t,
        barycentric: DVec3::new(1.0 - u - v, u, v),
    })
}

/// Collect the leaves whose boxes the ray crosses.
///
/// Each candidate is `(leaf_index, entry_distance)`. The entry distance is
/// only a lower bound on the real hit distance. Nearer children are
/// visited first, so candidates come out roughly front to back.
pub fn traverse_bvh(ray: &Ray, bvh: &Bvh) -> Vec<(u32, f64)> {
    let mut candidates = Vec::new();
    let Some(root) = bvh.root_index() else {
        return candidates;
    };

    let inv_direction = ray.inv_direction();
    let enter = |index: u32| {
        bvh.node(index)
            .bounds
            .intersect(ray.origin, inv_direction)
            .map(|span| (index, span.min))
    };

    let mut stack: Vec<(u32, f64)> = enter(root).into_iter().collect();
    while let Some((index, entry)) = stack.pop() {
        let node = bvh.node(index);
        if let Some(leaf) = node.leaf_index {
            candidates.push((leaf, entry));
            continue;
        }

        let left = node.left.and_then(enter);
        let right = node.right.and_then(enter);
        match (left, right) {
            (Some(l), Some(r)) => {
                // Farther child first so the nearer one is popped next
                if l.1 <= r.1 {
                    stack.push(r);
                    stack.push(l);
                } else {
                    stack.push(l);
                    stack.push(r);
                }
            }
            (Some(child), None) | (None, Some(child)) => stack.push(child),
            (None, None) => {}
        }
    }

    candidates
}

/// Candidates from [`traverse_bvh`] sorted by entry distance.
fn sorted_candidates(ray: &Ray, bvh: &Bvh) -> Vec<(u32, f64)> {
    let mut candidates = traverse_bvh(ray, bvh);
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
    candidates
}

/// Nearest triangle hit of an object-space ray against a mesh.
///
/// Uses the mesh BVH when built, otherwise tests every triangle.
pub fn intersect_mesh(ray: &Ray, mesh: &Mesh) -> Option<MeshHit> {
    let mut closest: Option<MeshHit> = None;

    let test_face = |face: usize, closest: &mut Option<MeshHit>| {
        if let Some(hit) = intersect_triangle(ray, &mesh.triangle(face)) {
            if closest.map_or(true, |c| hit.distance < c.distance) {
                *closest = Some(MeshHit {
                    face,
                    distance: hit.distance,
                    barycentric: hit.barycentric,
                });
            }
        }
    };

    match mesh.bvh() {
        Some(bvh) => {
            for (face, entry) in sorted_candidates(ray, bvh) {
                if closest.is_some_and(|c| entry > c.distance) {
                    break;
                }
                test_face(face as usize, &mut closest);
            }
        }
        None => {
            for face in 0..mesh.triangle_count() {
                test_face(face, &mut closest);
            }
        }
    }

    closest
}

/// Intersect a world-space ray with one transformed object.
///
/// The ray is carried into object space, and the hit is carried back:
/// position by the forward matrix, distance measured from the world-space
/// origin, and the shading frame by the normal matrix.
pub fn intersect_object<'a>(ray: &Ray, object: &'a Object) -> Option<RayHitInfo<'a>> {
    let inverse = object.inverse();
    let local_ray = Ray::new(
        inverse.transform_point3(ray.origin),
        inverse.transform_vector3(ray.direction),
    );

    let hit = intersect_mesh(&local_ray, &object.mesh)?;

    let mesh = &object.mesh;
    let [i0, i1, i2] = mesh.faces[hit.face].map(|i| i as usize);
    let w = hit.barycentric;
    let interpolate = |attr: &[DVec3]| attr[i0] * w.x + attr[i1] * w.y + attr[i2] * w.z;

    let uv = mesh.uvs[i0] * w.x + mesh.uvs[i1] * w.y + mesh.uvs[i2] * w.z;

    let matrix = object.matrix();
    let position = matrix.transform_point3(local_ray.at(hit.distance));

    let normal_matrix = object.normal_matrix();
    let carry = |v: DVec3, fallback: DVec3| (*normal_matrix * v).try_normalize().unwrap_or(fallback);

    let [p0, p1, p2] = mesh.triangle(hit.face);
    let area = 0.5
        * matrix
            .transform_vector3(p1 - p0)
            .cross(matrix.transform_vector3(p2 - p0))
            .length();

    let material: &'a Material = &object.material;

    Some(RayHitInfo {
        distance: position.distance(ray.origin),
        position,
        normal: carry(interpolate(&mesh.normals), DVec3::Z),
        tangent: carry(interpolate(&mesh.tangents), DVec3::X),
        bitangent: carry(interpolate(&mesh.bitangents), DVec3::Y),
        uv,
        barycentric: w,
        area,
        material: Some(material),
        emitted: material.emissive(uv) * material.emissive_intensity(uv),
    })
}

/// Nearest hit over the whole scene, with normal mapping applied.
///
/// Returns a hit with `distance == f64::MAX` when nothing is hit.
pub fn intersect_scene<'a>(ray: &Ray, scene: &'a Scene) -> RayHitInfo<'a> {
    let mut closest = RayHitInfo::default();

    let consider = |object: &'a Object, closest: &mut RayHitInfo<'a>| {
        if let Some(hit) = intersect_object(ray, object) {
            if hit.distance < closest.distance {
                *closest = hit;
            }
        }
    };

    match scene.bvh() {
        Some(bvh) => {
            for (index, entry) in sorted_candidates(ray, bvh) {
                if entry > closest.distance {
                    break;
                }
                // A BVH left stale by direct edits of `objects` may point past the end
                if let Some(object) = scene.objects.get(index as usize) {
                    consider(object, &mut closest);
                }
            }
        }
        None => {
            for object in &scene.objects {
                consider(object, &mut closest);
            }
        }
    }

    if closest.is_hit() {
        apply_normal_map(&mut closest);
    }
    closest
}

/// Perturb the shading normal by the material's tangent-space normal map.
///
/// The tangent is re-orthogonalized against the new normal so the frame
/// stays orthonormal for sampling.
pub fn apply_normal_map(hit: &mut RayHitInfo) {
    let Some(encoded) = hit.material.and_then(|m| m.normal(hit.uv)) else {
        return;
    };

    let tbn = DMat3::from_cols(hit.tangent, hit.bitangent, hit.normal);
    let Some(normal) = (tbn * (encoded * 2.0 - DVec3::ONE)).try_normalize() else {
        return;
    };

    let handedness = hit.tangent.cross(hit.bitangent).dot(hit.normal).signum();
    if let Some(tangent) = (hit.tangent - normal * normal.dot(hit.tangent)).try_normalize() {
        hit.tangent = tangent;
        hit.bitangent = normal.cross(tangent) * handedness;
    }
    hit.normal = normal;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use lux_core::{Texture, Transform};
    use lux_math::{Aabb, Color, DQuat};

    fn unit_triangle() -> [DVec3; 3] {
        [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ]
    }

    fn object(mesh: Mesh, material: Material, transform: Transform) -> Object {
        Object::new("test", Arc::new(mesh), Arc::new(material), transform)
    }

    #[test]
    fn test_triangle_hit_analytic() {
        let ray = Ray::new(DVec3::new(0.25, 0.25, 1.0), -DVec3::Z);
        let hit = intersect_triangle(&ray, &unit_triangle()).expect("should hit");

        assert!((hit.distance - 1.0).abs() < 1e-6);
        assert!((hit.barycentric - DVec3::new(0.5, 0.25, 0.25)).length() < 1e-6);
    }

    #[test]
    fn test_triangle_parallel_never_hits() {
        let ray = Ray::new(DVec3::new(-1.0, 0.25, 0.0), DVec3::X);
        assert!(intersect_triangle(&ray, &unit_triangle()).is_none());

        let above = Ray::new(DVec3::new(-1.0, 0.25, 0.5), DVec3::X);
        assert!(intersect_triangle(&above, &unit_triangle()).is_none());
    }

    #[test]
    fn test_triangle_behind_and_outside() {
        // Pointing away
        let away = Ray::new(DVec3::new(0.25, 0.25, 1.0), DVec3::Z);
        assert!(intersect_triangle(&away, &unit_triangle()).is_none());

        // Past the hypotenuse
        let outside = Ray::new(DVec3::new(0.8, 0.8, 1.0), -DVec3::Z);
        assert!(intersect_triangle(&outside, &unit_triangle()).is_none());

        // Origin on the surface is rejected as a self-intersection
        let on_surface = Ray::new(DVec3::new(0.25, 0.25, 0.0), -DVec3::Z);
        assert!(intersect_triangle(&on_surface, &unit_triangle()).is_none());
    }

    #[test]
    fn test_triangle_edge_is_admitted() {
        let ray = Ray::new(DVec3::new(0.5, 0.0, 1.0), -DVec3::Z);
        let hit = intersect_triangle(&ray, &unit_triangle()).expect("edge hit");
        assert!(hit.barycentric.z.abs() < 1e-9);
    }

    #[test]
    fn test_traverse_bvh_front_to_back() {
        let bvh = Bvh::from_bounds(vec![
            Aabb::from_points(DVec3::new(-0.5, -0.5, -1.0), DVec3::new(0.5, 0.5, 0.0)),
            Aabb::from_points(DVec3::new(-0.5, -0.5, 0.0), DVec3::new(0.5, 0.5, 1.0)),
        ]);
        let ray = Ray::from_points(DVec3::new(0.0, 0.0, 2.0), DVec3::ZERO);

        let order: Vec<u32> = traverse_bvh(&ray, &bvh).iter().map(|c| c.0).collect();
        assert_eq!(order, vec![1, 0]);

        let miss = Ray::new(DVec3::new(5.0, 0.0, 2.0), -DVec3::Z);
        assert!(traverse_bvh(&miss, &bvh).is_empty());
    }

    #[test]
    fn test_traverse_bvh_entry_is_lower_bound() {
        let bvh = Bvh::from_bounds(vec![Aabb::from_points(DVec3::splat(-1.0), DVec3::splat(1.0))]);
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z);

        let candidates = traverse_bvh(&ray, &bvh);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].1 <= 4.0);
    }

    #[test]
    fn test_mesh_nearest_hit_regardless_of_order() {
        let near = [
            DVec3::new(-1.0, -1.0, -1.0),
            DVec3::new(1.0, -1.0, -1.0),
            DVec3::new(0.0, 1.0, -1.0),
        ];
        let far = near.map(|p| p - DVec3::Z);

        for positions in [[near, far].concat(), [far, near].concat()] {
            let mut mesh = Mesh::new(positions, vec![[0, 1, 2], [3, 4, 5]]);
            let ray = Ray::new(DVec3::ZERO, -DVec3::Z);

            let linear = intersect_mesh(&ray, &mesh).expect("linear hit");
            assert!((linear.distance - 1.0).abs() < 1e-9);

            mesh.build_bvh();
            let accelerated = intersect_mesh(&ray, &mesh).expect("bvh hit");
            assert_eq!(linear, accelerated);
        }
    }

    #[test]
    fn test_object_non_uniform_scale() {
        let transform = Transform {
            translation: DVec3::new(0.0, 0.0, -3.0),
            rotation: DQuat::IDENTITY,
            scale: DVec3::new(2.0, 3.0, 1.0),
        };
        let obj = object(Mesh::quad(1.0, 1.0), Material::default(), transform);

        let ray = Ray::new(DVec3::new(0.3, 0.2, 0.0), -DVec3::Z);
        let hit = intersect_object(&ray, &obj).expect("should hit");

        assert!((hit.distance - 3.0).abs() < 1e-9);
        assert!((hit.position - DVec3::new(0.3, 0.2, -3.0)).length() < 1e-9);
        assert!((hit.normal - DVec3::Z).length() < 1e-9);
        // Each half of the quad is 0.5 in object space, scaled by 2 * 3
        assert!((hit.area - 3.0).abs() < 1e-9);
        // x = 0.3 is u = 0.3 / 2 + 0.5 on the stretched quad
        assert!((hit.uv.x - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_object_rotation_carries_frame() {
        let transform = Transform {
            translation: DVec3::ZERO,
            rotation: DQuat::from_rotation_y(std::f64::consts::FRAC_PI_2),
            scale: DVec3::ONE,
        };
        let obj = object(Mesh::quad(1.0, 1.0), Material::default(), transform);

        let ray = Ray::new(DVec3::new(5.0, 0.1, 0.2), -DVec3::X);
        let hit = intersect_object(&ray, &obj).expect("should hit");

        assert!((hit.distance - 5.0).abs() < 1e-9);
        assert!((hit.normal - DVec3::X).length() < 1e-9);
        assert!((hit.tangent - -DVec3::Z).length() < 1e-9);
        assert!((hit.bitangent - DVec3::Y).length() < 1e-9);
    }

    #[test]
    fn test_object_emitted_is_precomputed() {
        let lamp = Material::emitter("lamp", Color::new(1.0, 0.5, 0.25), 2.0);
        let obj = object(Mesh::quad(1.0, 1.0), lamp, Transform::default());

        let ray = Ray::new(DVec3::new(0.1, 0.1, 1.0), -DVec3::Z);
        let hit = intersect_object(&ray, &obj).expect("should hit");
        assert_eq!(hit.emitted, Color::new(2.0, 1.0, 0.5));
        assert!(hit.is_emissive());
    }

    fn two_cube_scene() -> Scene {
        let mut scene = Scene::new();
        for z in [-2.0, 0.0] {
            let mut mesh = Mesh::cube(1.0);
            mesh.build_bvh();
            scene.add_object(object(
                mesh,
                Material::default(),
                Transform::from_translation(DVec3::new(0.0, 0.0, z)),
            ));
        }
        scene
    }

    #[test]
    fn test_scene_nearest_hit() {
        let mut scene = two_cube_scene();
        let ray = Ray::new(DVec3::new(0.0, 0.0, 2.0), -DVec3::Z);

        let linear = intersect_scene(&ray, &scene);
        assert!((linear.distance - 1.5).abs() < 1e-9);

        scene.build_bvh();
        let accelerated = intersect_scene(&ray, &scene);
        assert!((accelerated.distance - 1.5).abs() < 1e-9);
        assert!((accelerated.normal - DVec3::Z).length() < 1e-9);
    }

    #[test]
    fn test_scene_miss_is_sentinel() {
        let mut scene = two_cube_scene();
        scene.build_bvh();

        let ray = Ray::new(DVec3::new(0.0, 0.0, 2.0), DVec3::Z);
        let hit = intersect_scene(&ray, &scene);

        assert!(!hit.is_hit());
        assert_eq!(hit.distance, f64::MAX);
        assert!(hit.material.is_none());
    }

    #[test]
    fn test_stale_scene_bvh_does_not_panic() {
        let mut scene = two_cube_scene();
        scene.build_bvh();
        scene.objects.truncate(1);

        // The near cube (index 1) is gone; the far one is still found
        let ray = Ray::new(DVec3::new(0.0, 0.0, 2.0), -DVec3::Z);
        let hit = intersect_scene(&ray, &scene);
        assert!((hit.distance - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_normal_map_perturbs_normal() {
        let texture = Texture::new(1, 1, vec![[0.75, 1.0, 0.5, 1.0]], "normal").expect("texture");
        let material = Material::default().with_normal_texture(Arc::new(texture));
        let mut scene = Scene::new();
        scene.add_object(object(Mesh::quad(1.0, 1.0), material, Transform::default()));

        let ray = Ray::new(DVec3::new(0.1, 0.1, 1.0), -DVec3::Z);
        let hit = intersect_scene(&ray, &scene);

        let expected = DVec3::new(0.5, 1.0, 0.0).normalize();
        assert!((hit.normal - expected).length() < 1e-6);
        assert!(hit.tangent.dot(hit.normal).abs() < 1e-9);
        assert!(hit.bitangent.dot(hit.normal).abs() < 1e-9);
    }
}
