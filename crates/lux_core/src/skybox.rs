//! Environment seen by rays that leave the scene.

use std::f64::consts::PI;
use std::sync::Arc;

use lux_math::{Color, DVec2, DVec3};

use crate::texture::Texture;

pub const DEFAULT_SKYBOX_COLOR: Color = Color::new(0.65, 0.65, 0.9);

/// Constant color or equirectangular environment map.
#[derive(Clone, Debug)]
pub struct Skybox {
    pub color: Color,
    pub texture: Option<Arc<Texture>>,
    pub intensity: f64,
}

impl Default for Skybox {
    fn default() -> Self {
        Self::solid(DEFAULT_SKYBOX_COLOR)
    }
}

impl Skybox {
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            texture: None,
            intensity: 1.0,
        }
    }

    pub fn from_texture(texture: Arc<Texture>, intensity: f64) -> Self {
        Self {
            color: Color::ONE,
            texture: Some(texture),
            intensity,
        }
    }

    /// Radiance arriving from `direction` (unit length).
    pub fn color(&self, direction: DVec3) -> Color {
        match &self.texture {
            Some(tex) => tex.sample(equirect_uv(direction)) * self.intensity,
            None => self.color * self.intensity,
        }
    }
}

/// Map a unit direction to latitude/longitude texture coordinates.
pub fn equirect_uv(direction: DVec3) -> DVec2 {
    let u = 0.5 + direction.z.atan2(direction.x) / (2.0 * PI);
    let v = 0.5 - direction.y.clamp(-1.0, 1.0).asin() / PI;
    DVec2::new(u, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_skybox() {
        let sky = Skybox::default();
        assert_eq!(sky.color(DVec3::Y), DEFAULT_SKYBOX_COLOR);
        assert_eq!(sky.color(-DVec3::X), DEFAULT_SKYBOX_COLOR);
    }

    #[test]
    fn test_equirect_uv() {
        let up = equirect_uv(DVec3::Y);
        assert!(up.y.abs() < 1e-12);

        let horizon = equirect_uv(DVec3::X);
        assert!((horizon.x - 0.5).abs() < 1e-12);
        assert!((horizon.y - 0.5).abs() < 1e-12);

        let quarter = equirect_uv(DVec3::Z);
        assert!((quarter.x - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_textured_skybox_intensity() {
        let tex = Arc::new(Texture::solid_color(DVec3::new(0.2, 0.4, 0.6)));
        let sky = Skybox::from_texture(tex, 2.0);
        let c = sky.color(DVec3::new(0.3, 0.4, 0.5).normalize());
        assert!((c - DVec3::new(0.4, 0.8, 1.2)).length() < 1e-6);
    }
}
