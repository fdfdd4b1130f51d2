//! Physical camera description.
//!
//! Lens quantities are stored the way a photographer states them
//! (millimetres, f-stops) and converted to metres on access.

use lux_math::{orthonormal_basis, DMat3, DVec3, MM_TO_M};

/// Pinhole/thin-lens camera.
///
/// The camera looks down its local -Z axis with +Y up; `rotation` maps
/// camera space into world space.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: DVec3,
    pub rotation: DMat3,

    /// Focal length in millimetres
    pub focal_length: f64,

    /// Sensor width in millimetres
    pub sensor_width: f64,

    /// Aperture as an f-number
    pub aperture: f64,

    /// Distance to the plane of perfect focus, in metres
    pub focus_distance: f64,

    /// Closest distance a camera ray may hit, in metres
    pub near_plane: f64,
    /// Farthest distance any ray may hit, in metres
    pub far_plane: f64,

    /// When off, every ray leaves from the lens center
    pub depth_of_field: bool,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            position: DVec3::ZERO,
            rotation: DMat3::IDENTITY,
            focal_length: 50.0,
            sensor_width: 0.0,
            aperture: 2.8,
            focus_distance: 2.0,
            near_plane: 0.1,
            far_plane: 100.0,
            depth_of_field: false,
        };
        camera.set_fov_degrees(45.0);
        camera
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set camera position.
    pub fn with_position(mut self, position: DVec3) -> Self {
        self.position = position;
        self
    }

    /// Place the camera at `eye` looking toward `target`.
    pub fn looking_at(mut self, eye: DVec3, target: DVec3, up: DVec3) -> Self {
        self.look_at(eye, target, up);
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, focal_length: f64, aperture: f64, focus_distance: f64) -> Self {
        self.focal_length = focal_length.max(1.0);
        self.aperture = aperture.max(0.1);
        self.focus_distance = focus_distance.max(1e-3);
        self
    }

    /// Set the hit distance range; `far` is kept at or beyond `near`.
    pub fn with_clip_planes(mut self, near: f64, far: f64) -> Self {
        self.near_plane = near.max(0.0);
        self.far_plane = far.max(self.near_plane);
        self
    }

    pub fn with_depth_of_field(mut self, enabled: bool) -> Self {
        self.depth_of_field = enabled;
        self
    }

    /// Orient the camera so its -Z axis points from `eye` to `target`.
    ///
    /// A degenerate `up` (parallel to the view direction) falls back to an
    /// arbitrary perpendicular.
    pub fn look_at(&mut self, eye: DVec3, target: DVec3, up: DVec3) {
        let back = (eye - target).normalize_or_zero();
        if back == DVec3::ZERO {
            return;
        }

        let right = up
            .cross(back)
            .try_normalize()
            .unwrap_or_else(|| orthonormal_basis(back).0);
        let true_up = back.cross(right);

        self.position = eye;
        self.rotation = DMat3::from_cols(right, true_up, back);
    }

    /// Derive the sensor width from a horizontal field of view.
    pub fn set_fov_degrees(&mut self, fov: f64) {
        let half = (fov.clamp(1.0, 179.0) * 0.5).to_radians();
        self.sensor_width = 2.0 * self.focal_length * half.tan();
    }

    /// Horizontal field of view implied by sensor and focal length.
    pub fn fov_degrees(&self) -> f64 {
        (2.0 * (self.sensor_width / (2.0 * self.focal_length)).atan()).to_degrees()
    }

    pub fn forward(&self) -> DVec3 {
        -self.rotation.z_axis
    }

    pub fn focal_length_m(&self) -> f64 {
        self.focal_length * MM_TO_M
    }

    pub fn sensor_width_m(&self) -> f64 {
        self.sensor_width * MM_TO_M
    }

    /// Radius of the lens opening, in metres.
    pub fn lens_radius(&self) -> f64 {
        self.focal_length_m() / self.aperture / 2.0
    }
}
