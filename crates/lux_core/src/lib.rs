//! Lux Core - Scene snapshot types for the Lux path tracer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh` with its triangle BVH, and the arena `Bvh` builder
//!   shared with the scene level
//! - **Shading inputs**: `Material`, `Texture`, `Skybox`
//! - **Scene graph types**: `Scene`, `Object`, `Transform`, `Light`, `Camera`
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lux_core::{Camera, Material, Mesh, Object, Scene, Transform};
//! use lux_math::DVec3;
//!
//! let mut mesh = Mesh::cube(1.0);
//! mesh.build_bvh();
//!
//! let mut scene = Scene::new();
//! scene.add_object(Object::new(
//!     "cube",
//!     Arc::new(mesh),
//!     Arc::new(Material::new("grey", DVec3::splat(0.5))),
//!     Transform::default(),
//! ));
//! scene.set_camera(Camera::new().looking_at(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO, DVec3::Y));
//! scene.build_bvh();
//! assert_eq!(scene.total_triangle_count(), 12);
//! ```

pub mod bvh;
pub mod camera;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod skybox;
pub mod texture;

// Re-export commonly used types
pub use bvh::{Bvh, BvhNode, BVH_CONSTRUCTION_EPSILON};
pub use camera::Camera;
pub use light::{Light, LightKind};
pub use material::Material;
pub use mesh::Mesh;
pub use scene::{Object, Scene, Transform};
pub use skybox::{Skybox, DEFAULT_SKYBOX_COLOR};
pub use texture::{Texture, TextureError, TextureResult};
