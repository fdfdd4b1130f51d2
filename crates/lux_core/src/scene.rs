//! Scene snapshot handed to the renderer.
//!
//! A scene is a flat list of objects (mesh + material + transform) plus
//! punctual lights, an optional camera and a skybox. The renderer only
//! reads it; geometry changes between renders go through the methods
//! here so the acceleration structures get rebuilt.

use std::sync::Arc;

use lux_math::{Aabb, DMat3, DMat4, DQuat, DVec3, EulerRot, Mat4Ext};

use crate::bvh::Bvh;
use crate::camera::Camera;
use crate::light::Light;
use crate::material::Material;
use crate::mesh::Mesh;
use crate::skybox::Skybox;

/// Transform components that can be composed into a matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with only translation.
    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Build from Euler angles in degrees, applied X then Y then Z.
    pub fn from_euler_degrees(translation: DVec3, rotation: DVec3, scale: DVec3) -> Self {
        Self {
            translation,
            rotation: DQuat::from_euler(
                EulerRot::ZYX,
                rotation.z.to_radians(),
                rotation.y.to_radians(),
                rotation.x.to_radians(),
            ),
            scale,
        }
    }

    /// Decompose a 4x4 matrix into translation, rotation, and scale.
    pub fn from_matrix(matrix: DMat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Order: Scale -> Rotate -> Translate, i.e. `T * R * S`.
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// A mesh placed in the world with a material.
///
/// The matrices the intersector needs are cached on construction and
/// whenever the transform changes.
#[derive(Clone, Debug)]
pub struct Object {
    pub name: String,
    pub mesh: Arc<Mesh>,
    pub material: Arc<Material>,
    transform: Transform,
    matrix: DMat4,
    inverse: DMat4,
    normal_matrix: DMat3,
    world_bounds: Aabb,
}

impl Object {
    pub fn new(
        name: impl Into<String>,
        mesh: Arc<Mesh>,
        material: Arc<Material>,
        transform: Transform,
    ) -> Self {
        let mut object = Self {
            name: name.into(),
            mesh,
            material,
            transform,
            matrix: DMat4::IDENTITY,
            inverse: DMat4::IDENTITY,
            normal_matrix: DMat3::IDENTITY,
            world_bounds: Aabb::EMPTY,
        };
        object.update_cache();
        object
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.update_cache();
    }

    #[inline]
    pub fn matrix(&self) -> &DMat4 {
        &self.matrix
    }

    #[inline]
    pub fn inverse(&self) -> &DMat4 {
        &self.inverse
    }

    /// Inverse-transpose of the linear part, for normals and tangents.
    #[inline]
    pub fn normal_matrix(&self) -> &DMat3 {
        &self.normal_matrix
    }

    pub fn world_bounds(&self) -> Aabb {
        self.world_bounds
    }

    fn update_cache(&mut self) {
        self.matrix = self.transform.to_matrix();
        self.inverse = self.matrix.inverse_or_identity();
        self.normal_matrix = self.matrix.normal_matrix();
        self.world_bounds = self.matrix.transform_aabb(&self.mesh.bounds);
    }
}

/// A complete scene ready for rendering.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub objects: Vec<Object>,
    pub lights: Vec<Light>,
    pub camera: Option<Camera>,
    pub skybox: Skybox,
    bvh: Option<Bvh>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object and return its index. Invalidates the scene BVH.
    pub fn add_object(&mut self, object: Object) -> usize {
        self.objects.push(object);
        self.bvh = None;
        self.objects.len() - 1
    }

    /// Add a punctual light. Invalidates the scene BVH.
    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
        self.bvh = None;
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn set_skybox(&mut self, skybox: Skybox) {
        self.skybox = skybox;
    }

    /// Build the BVH over object world bounds.
    ///
    /// Mesh BVHs are built by the meshes themselves before they are
    /// shared between objects.
    pub fn build_bvh(&mut self) {
        let bvh = Bvh::from_bounds(self.objects.iter().map(Object::world_bounds));
        log::debug!(
            "Scene BVH: {} objects, {} nodes",
            self.objects.len(),
            bvh.nodes().len()
        );
        self.bvh = Some(bvh);
    }

    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    /// Get total triangle count across all objects.
    pub fn total_triangle_count(&self) -> usize {
        self.objects.iter().map(|o| o.mesh.triangle_count()).sum()
    }

    /// Compute the world-space bounding box of all objects.
    pub fn world_bounds(&self) -> Aabb {
        self.objects
            .iter()
            .fold(Aabb::EMPTY, |acc, o| acc.union(&o.world_bounds()))
    }
}
