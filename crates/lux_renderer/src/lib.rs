//! Lux Renderer - offline CPU path tracing.
//!
//! A Monte Carlo path tracer over a [`lux_core::Scene`] snapshot:
//!
//! - **Intersection**: Möller-Trumbore triangles behind per-mesh and
//!   per-scene BVHs, with object transforms and normal mapping
//! - **Shading**: Cook-Torrance (GGX, Smith, Schlick) over Lambert, with
//!   lobe sampling and multiple importance sampling of area lights
//! - **Orchestration**: chunked sample passes rendered on one thread or a
//!   rayon pool, accumulated into a linear `f64` framebuffer
//!
//! # Example
//!
//! ```
//! use lux_core::{Camera, Scene, Skybox};
//! use lux_math::DVec3;
//! use lux_renderer::{RenderMode, RenderSettings, RenderStatus, Renderer};
//!
//! let mut scene = Scene::new();
//! scene.set_camera(Camera::new());
//! scene.set_skybox(Skybox::solid(DVec3::splat(0.5)));
//!
//! let mut renderer = Renderer::new(RenderSettings {
//!     width: 8,
//!     height: 8,
//!     render_mode: RenderMode::SingleThreaded,
//!     ..Default::default()
//! });
//! assert_eq!(renderer.render_frame(&scene).unwrap(), RenderStatus::Completed);
//! assert!((renderer.framebuffer().pixel(4, 4).unwrap()[0] - 0.5).abs() < 1e-12);
//! ```

pub mod camera_ray;
pub mod chunk;
pub mod error;
pub mod framebuffer;
pub mod hit;
pub mod integrator;
pub mod intersect;
pub mod pbr;
pub mod render_time;
pub mod renderer;
pub mod sampler;
pub mod settings;
pub mod tone_mapping;

pub use camera_ray::CameraRayEmitter;
pub use chunk::{generate_chunks, Chunk, CHUNK_COUNT_UPDATE_INTERVAL};
pub use error::{RenderError, RenderResult};
pub use framebuffer::Framebuffer;
pub use hit::RayHitInfo;
pub use integrator::{PathTracer, SPAWN_OFFSET};
pub use intersect::{intersect_mesh, intersect_object, intersect_scene, intersect_triangle, INTERSECTION_TOLERANCE};
pub use pbr::{BrdfInput, DIELECTRIC_REFLECTANCE};
pub use render_time::{RenderStats, RenderTime};
pub use renderer::{RenderStatus, RenderStrategy, Renderer};
pub use sampler::{collect_light_samples, LightSample};
pub use settings::{RenderMode, RenderSettings, DEFAULT_CHUNK_SIZE};
pub use tone_mapping::{linear_to_srgb, srgb_to_linear, ToneMapping};
