//! Triangle mesh geometry in object space.
//!
//! Per-vertex attributes are stored as parallel arrays (positions, normals,
//! UVs, tangents, bitangents) indexed by triangle faces. A mesh owns the BVH
//! over its triangle bounds once `build_bvh()` has been called.

use std::f64::consts::PI;

use lux_math::{orthonormal_basis, Aabb, DVec2, DVec3};

use crate::bvh::Bvh;

/// A triangle mesh with shading attributes and an optional triangle BVH.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one DVec3 per vertex)
    pub positions: Vec<DVec3>,

    /// Unit vertex normals
    pub normals: Vec<DVec3>,

    /// UV coordinates (zero when the source had none)
    pub uvs: Vec<DVec2>,

    /// Unit tangents, aligned with +U where UVs allow it
    pub tangents: Vec<DVec3>,

    /// Unit bitangents, aligned with +V where UVs allow it
    pub bitangents: Vec<DVec3>,

    /// Triangles as vertex index triplets, counter-clockwise when seen from
    /// the side the face normal points to
    pub faces: Vec<[u32; 3]>,

    /// Axis-aligned bounding box of all positions
    pub bounds: Aabb,

    bvh: Option<Bvh>,
}

impl Mesh {
    /// Create a mesh from positions and triangles.
    ///
    /// Faces referencing a vertex that does not exist are dropped. Smooth
    /// normals and tangents are computed; use `with_normals`/`with_uvs` to
    /// supply authored attributes.
    pub fn new(positions: Vec<DVec3>, faces: Vec<[u32; 3]>) -> Self {
        let vertex_count = positions.len();
        let face_count = faces.len();
        let faces: Vec<[u32; 3]> = faces
            .into_iter()
            .filter(|face| face.iter().all(|&i| (i as usize) < vertex_count))
            .collect();

        if faces.len() != face_count {
            log::warn!(
                "Dropped {} faces with out-of-range vertex indices (vertex count: {})",
                face_count - faces.len(),
                vertex_count
            );
        }

        let bounds = Aabb::from_iter_points(positions.iter().copied());
        let mut mesh = Self {
            positions,
            normals: Vec::new(),
            uvs: vec![DVec2::ZERO; vertex_count],
            tangents: Vec::new(),
            bitangents: Vec::new(),
            faces,
            bounds,
            bvh: None,
        };
        mesh.compute_normals();
        mesh.compute_tangents();
        mesh
    }

    /// Replace the computed normals with authored ones.
    ///
    /// Ignored (with a warning) when the count does not match the vertices.
    pub fn with_normals(mut self, normals: Vec<DVec3>) -> Self {
        if normals.len() != self.positions.len() {
            log::warn!(
                "Normals array length ({}) doesn't match vertex count ({}), keeping smooth normals",
                normals.len(),
                self.positions.len()
            );
            return self;
        }
        self.normals = normals
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(DVec3::Y))
            .collect();
        self.compute_tangents();
        self
    }

    /// Attach UV coordinates and rebuild the tangent frame from them.
    pub fn with_uvs(mut self, uvs: Vec<DVec2>) -> Self {
        if uvs.len() != self.positions.len() {
            log::warn!(
                "UV array length ({}) doesn't match vertex count ({}), ignoring UVs",
                uvs.len(),
                self.positions.len()
            );
            return self;
        }
        self.uvs = uvs;
        self.compute_tangents();
        self
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Face normals are not normalized before accumulation, so larger faces
    /// weigh more.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![DVec3::ZERO; self.positions.len()];

        for face in &self.faces {
            let [p0, p1, p2] = self.face_positions(face);
            let face_normal = (p1 - p0).cross(p2 - p0);

            for &i in face {
                normals[i as usize] += face_normal;
            }
        }

        // Default up normal for unreferenced or degenerate vertices
        self.normals = normals
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(DVec3::Y))
            .collect();
    }

    /// Compute per-vertex tangents and bitangents from UV derivatives.
    ///
    /// Vertices whose UVs are degenerate get an arbitrary frame around the
    /// normal instead.
    pub fn compute_tangents(&mut self) {
        let vertex_count = self.positions.len();
        let mut tangents = vec![DVec3::ZERO; vertex_count];
        let mut bitangents = vec![DVec3::ZERO; vertex_count];

        for face in &self.faces {
            let [p0, p1, p2] = self.face_positions(face);
            let [uv0, uv1, uv2] = face.map(|i| self.uvs[i as usize]);

            let edge1 = p1 - p0;
            let edge2 = p2 - p0;
            let duv1 = uv1 - uv0;
            let duv2 = uv2 - uv0;

            let det = duv1.x * duv2.y - duv2.x * duv1.y;
            if det.abs() < 1e-12 {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;
            let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * r;

            for &i in face {
                tangents[i as usize] += tangent;
                bitangents[i as usize] += bitangent;
            }
        }

        self.tangents = Vec::with_capacity(vertex_count);
        self.bitangents = Vec::with_capacity(vertex_count);
        for i in 0..vertex_count {
            let n = self.normals[i];
            // Gram-Schmidt against the normal
            let t = tangents[i] - n * n.dot(tangents[i]);

            let (t, b) = match t.try_normalize() {
                Some(t) => {
                    let b = n.cross(t);
                    // Keep the UV handedness (mirrored UVs flip the bitangent)
                    if b.dot(bitangents[i]) < 0.0 {
                        (t, -b)
                    } else {
                        (t, b)
                    }
                }
                None => orthonormal_basis(n),
            };
            self.tangents.push(t);
            self.bitangents.push(b);
        }
    }

    /// Build the BVH over triangle bounds. Call again after editing geometry.
    pub fn build_bvh(&mut self) {
        let bounds: Vec<Aabb> = self
            .faces
            .iter()
            .map(|face| Aabb::from_iter_points(self.face_positions(face)))
            .collect();
        self.bvh = Some(Bvh::from_bounds(bounds));
    }

    /// The triangle BVH, if built.
    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    /// Positions of triangle `face_index`.
    #[inline]
    pub fn triangle(&self, face_index: usize) -> [DVec3; 3] {
        self.face_positions(&self.faces[face_index])
    }

    /// Object-space area of triangle `face_index`.
    pub fn triangle_area(&self, face_index: usize) -> f64 {
        let [p0, p1, p2] = self.triangle(face_index);
        (p1 - p0).cross(p2 - p0).length() * 0.5
    }

    #[inline]
    fn face_positions(&self, face: &[u32; 3]) -> [DVec3; 3] {
        face.map(|i| self.positions[i as usize])
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    /// A `width` x `height` rectangle in the XY plane, centered on the
    /// origin and facing +Z, with UVs spanning [0, 1].
    pub fn quad(width: f64, height: f64) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        let positions = vec![
            DVec3::new(-hw, -hh, 0.0),
            DVec3::new(hw, -hh, 0.0),
            DVec3::new(hw, hh, 0.0),
            DVec3::new(-hw, hh, 0.0),
        ];
        let uvs = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.0, 1.0),
        ];
        Self::new(positions, vec![[0, 1, 2], [0, 2, 3]]).with_uvs(uvs)
    }

    /// An axis-aligned cube of edge `size` centered on the origin.
    ///
    /// Each face has its own four vertices so normals stay flat.
    pub fn cube(size: f64) -> Self {
        let h = size * 0.5;
        // (normal, u axis, v axis) per face; u x v = normal
        let sides = [
            (DVec3::X, -DVec3::Z, DVec3::Y),
            (-DVec3::X, DVec3::Z, DVec3::Y),
            (DVec3::Y, DVec3::X, -DVec3::Z),
            (-DVec3::Y, DVec3::X, DVec3::Z),
            (DVec3::Z, DVec3::X, DVec3::Y),
            (-DVec3::Z, -DVec3::X, DVec3::Y),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut faces = Vec::with_capacity(12);

        for (normal, u_axis, v_axis) in sides {
            let base = positions.len() as u32;
            for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                let offset = u_axis * (u * 2.0 - 1.0) + v_axis * (v * 2.0 - 1.0);
                positions.push((normal + offset) * h);
                normals.push(normal);
                uvs.push(DVec2::new(u, v));
            }
            faces.push([base, base + 1, base + 2]);
            faces.push([base, base + 2, base + 3]);
        }

        Self::new(positions, faces)
            .with_normals(normals)
            .with_uvs(uvs)
    }

    /// A UV sphere of `radius` centered on the origin, poles on the Y axis.
    ///
    /// Each of the `rings + 1` latitude rows holds `segments + 1` vertices so
    /// the UV seam closes. A non-positive radius or a zero count gives an
    /// empty mesh.
    pub fn sphere(radius: f64, segments: u32, rings: u32) -> Self {
        if radius.is_nan() || radius <= 0.0 || segments == 0 || rings == 0 {
            return Self::new(Vec::new(), Vec::new());
        }

        let row = segments + 1;
        let vertex_count = (row * (rings + 1)) as usize;
        let mut positions = Vec::with_capacity(vertex_count);
        let mut normals = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);

        for i in 0..=rings {
            let theta = i as f64 * PI / rings as f64;
            for j in 0..=segments {
                let phi = j as f64 * 2.0 * PI / segments as f64;
                let normal = DVec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                positions.push(normal * radius);
                normals.push(normal);
                uvs.push(DVec2::new(j as f64 / segments as f64, i as f64 / rings as f64));
            }
        }

        let mut faces = Vec::with_capacity((2 * segments * rings) as usize);
        for i in 0..rings {
            for j in 0..segments {
                let first = i * row + j;
                let second = first + row;
                faces.push([first + 1, second, first]);
                faces.push([first + 1, second + 1, second]);
            }
        }

        Self::new(positions, faces)
            .with_normals(normals)
            .with_uvs(uvs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> Mesh {
        Mesh::new(
            vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = single_triangle();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.bvh().is_none());
    }

    #[test]
    fn test_compute_normals_ccw() {
        let mesh = single_triangle();

        // Counter-clockwise seen from +Z, so the normal points +Z
        for normal in &mesh.normals {
            assert!((*normal - DVec3::Z).length() < 1e-12);
        }
    }

    #[test]
    fn test_out_of_range_faces_dropped() {
        let mesh = Mesh::new(
            vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            vec![[0, 1, 2], [0, 1, 7]],
        );
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.faces[0], [0, 1, 2]);
    }

    #[test]
    fn test_bounds_computation() {
        let mesh = Mesh::new(
            vec![
                DVec3::new(-1.0, -2.0, -3.0),
                DVec3::new(4.0, 5.0, 6.0),
                DVec3::new(0.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );

        assert_eq!(mesh.bounds.min, DVec3::new(-1.0, -2.0, -3.0));
        assert_eq!(mesh.bounds.max, DVec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_tangents_follow_uvs() {
        let mesh = Mesh::quad(2.0, 2.0);

        for i in 0..mesh.vertex_count() {
            assert!((mesh.tangents[i] - DVec3::X).length() < 1e-9, "tangent {}", i);
            assert!((mesh.bitangents[i] - DVec3::Y).length() < 1e-9, "bitangent {}", i);
            assert!((mesh.normals[i] - DVec3::Z).length() < 1e-9, "normal {}", i);
        }
    }

    #[test]
    fn test_tangents_without_uvs_are_orthonormal() {
        let mesh = single_triangle();
        let (n, t, b) = (mesh.normals[0], mesh.tangents[0], mesh.bitangents[0]);

        assert!(n.dot(t).abs() < 1e-12);
        assert!(n.dot(b).abs() < 1e-12);
        assert!((t.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cube_faces_point_outward() {
        let mesh = Mesh::cube(2.0);

        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.bounds.min, DVec3::splat(-1.0));
        assert_eq!(mesh.bounds.max, DVec3::splat(1.0));

        for (face_index, face) in mesh.faces.iter().enumerate() {
            let [p0, p1, p2] = mesh.triangle(face_index);
            let geometric = (p1 - p0).cross(p2 - p0).normalize();
            let shading = mesh.normals[face[0] as usize];
            assert!(
                (geometric - shading).length() < 1e-9,
                "face {} winding disagrees with its normal",
                face_index
            );
            // Outward: the normal points away from the center
            assert!(geometric.dot(p0) > 0.0);
        }
    }

    #[test]
    fn test_sphere_layout() {
        let mesh = Mesh::sphere(1.0, 10, 10);

        assert_eq!(mesh.vertex_count(), 121);
        assert_eq!(mesh.triangle_count(), 200);
        assert!((mesh.positions[0] - DVec3::Y).length() < 1e-12);
        assert!((mesh.normals[0] - DVec3::Y).length() < 1e-12);
        assert_eq!(mesh.uvs[0], DVec2::ZERO);
        assert!((mesh.bounds.max.y - 1.0).abs() < 1e-12);
        assert!((mesh.bounds.min.y + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sphere_faces_point_outward() {
        let mesh = Mesh::sphere(2.0, 12, 8);

        for face_index in 0..mesh.triangle_count() {
            // Triangles touching a pole collapse to zero area
            if mesh.triangle_area(face_index) < 1e-12 {
                continue;
            }
            let [p0, p1, p2] = mesh.triangle(face_index);
            let geometric = (p1 - p0).cross(p2 - p0);
            let centroid = (p0 + p1 + p2) / 3.0;
            assert!(geometric.dot(centroid) > 0.0, "face {} points inward", face_index);
        }
    }

    #[test]
    fn test_sphere_invalid_parameters_are_empty() {
        for mesh in [
            Mesh::sphere(-1.0, 10, 10),
            Mesh::sphere(1.0, 0, 10),
            Mesh::sphere(1.0, 10, 0),
        ] {
            assert_eq!(mesh.vertex_count(), 0);
            assert_eq!(mesh.triangle_count(), 0);
        }
    }

    #[test]
    fn test_triangle_area() {
        let mesh = single_triangle();
        assert!((mesh.triangle_area(0) - 0.5).abs() < 1e-12);

        let quad = Mesh::quad(2.0, 3.0);
        let total: f64 = (0..quad.triangle_count()).map(|i| quad.triangle_area(i)).sum();
        assert!((total - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_build_bvh() {
        let mut mesh = Mesh::cube(1.0);
        mesh.build_bvh();

        let bvh = mesh.bvh().expect("bvh was built");
        let root = bvh.root().expect("non-empty mesh has a root");
        assert!(root.bounds.min.x <= -0.5);
        assert!(root.bounds.max.x >= 0.5);
        assert_eq!(bvh.nodes().len(), 2 * mesh.triangle_count() - 1);
    }
}
