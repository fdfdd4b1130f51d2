//! Primary ray generation.

use lux_core::Camera;
use lux_math::{DMat3, DVec2, DVec3, Ray};
use rand::Rng;

/// Generates camera rays through a virtual sensor placed on the focus
/// plane.
///
/// `u` runs left to right and `v` top to bottom, both in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct CameraRayEmitter {
    position: DVec3,
    rotation: DMat3,
    lens_radius: f64,
    top_left: DVec3,
    horizontal: DVec3,
    vertical: DVec3,
}

impl CameraRayEmitter {
    pub fn new(camera: &Camera, aspect_ratio: f64) -> Self {
        let focal_length = camera.focal_length_m();
        let sensor_width = camera.sensor_width_m();
        let sensor_height = sensor_width / aspect_ratio;
        let scale = camera.focus_distance / focal_length;

        // Sensor corner projected onto the focus plane
        let corner = |x: f64, y: f64| {
            camera.rotation * DVec3::new(x, y, -focal_length) * scale + camera.position
        };

        let top_left = corner(-sensor_width * 0.5, sensor_height * 0.5);
        let top_right = corner(sensor_width * 0.5, sensor_height * 0.5);
        let bottom_left = corner(-sensor_width * 0.5, -sensor_height * 0.5);

        Self {
            position: camera.position,
            rotation: camera.rotation,
            lens_radius: if camera.depth_of_field {
                camera.lens_radius()
            } else {
                0.0
            },
            top_left,
            horizontal: top_right - top_left,
            vertical: bottom_left - top_left,
        }
    }

    /// Point on the focus plane for sensor coordinates `(u, v)`.
    pub fn focus_point(&self, u: f64, v: f64) -> DVec3 {
        self.top_left + self.horizontal * u + self.vertical * v
    }

    /// Ray from a point on the lens through the focus point.
    pub fn generate_ray<R: Rng + ?Sized>(&self, u: f64, v: f64, rng: &mut R) -> Ray {
        let origin = if self.lens_radius > 0.0 {
            let offset = random_in_unit_disk(rng) * self.lens_radius;
            self.position + self.rotation * DVec3::new(offset.x, offset.y, 0.0)
        } else {
            self.position
        };
        Ray::from_points(origin, self.focus_point(u, v))
    }
}

/// Sample a random point in the unit disk.
fn random_in_unit_disk<R: Rng + ?Sized>(rng: &mut R) -> DVec2 {
    loop {
        let p = DVec2::new(rng.gen::<f64>() * 2.0 - 1.0, rng.gen::<f64>() * 2.0 - 1.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}
