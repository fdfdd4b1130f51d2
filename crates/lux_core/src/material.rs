//! Physically based material description.

use std::sync::Arc;

use lux_math::{Color, DVec2, DVec3};

use crate::texture::Texture;

/// A metal/roughness PBR material.
///
/// Every channel has a constant value and an optional texture; when the
/// texture is present it wins. Getters are evaluated per hit with the
/// surface UV.
#[derive(Clone, Debug)]
pub struct Material {
    /// Material name
    pub name: String,

    /// Diffuse/albedo color (linear RGB, 0-1)
    pub diffuse_color: Color,

    /// Roughness factor (0=smooth, 1=rough)
    pub roughness: f64,

    /// Metallic factor (0=dielectric, 1=metal)
    pub metalness: f64,

    /// Emissive color (linear RGB, for light-emitting surfaces)
    pub emissive_color: Color,

    /// Multiplier applied to the emissive color
    pub emissive_intensity: f64,

    pub diffuse_texture: Option<Arc<Texture>>,

    /// Tangent-space normal map, encoded in [0, 1]
    pub normal_texture: Option<Arc<Texture>>,

    /// Roughness is read from the green channel
    pub roughness_texture: Option<Arc<Texture>>,

    /// Metalness is read from the blue channel
    pub metalness_texture: Option<Arc<Texture>>,

    pub emissive_texture: Option<Arc<Texture>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: Color::splat(0.5), // Grey default
            roughness: 0.5,
            metalness: 0.0,
            emissive_color: Color::ZERO,
            emissive_intensity: 1.0,
            diffuse_texture: None,
            normal_texture: None,
            roughness_texture: None,
            metalness_texture: None,
            emissive_texture: None,
        }
    }
}

impl Material {
    /// Create a new material with just a name and diffuse color.
    pub fn new(name: impl Into<String>, diffuse_color: Color) -> Self {
        Self {
            name: name.into(),
            diffuse_color,
            ..Default::default()
        }
    }

    /// Create a pure emitter.
    pub fn emitter(name: impl Into<String>, color: Color, intensity: f64) -> Self {
        Self {
            name: name.into(),
            diffuse_color: Color::ZERO,
            emissive_color: color,
            emissive_intensity: intensity,
            ..Default::default()
        }
    }

    pub fn with_roughness(mut self, roughness: f64) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_metalness(mut self, metalness: f64) -> Self {
        self.metalness = metalness.clamp(0.0, 1.0);
        self
    }

    pub fn with_normal_texture(mut self, texture: Arc<Texture>) -> Self {
        self.normal_texture = Some(texture);
        self
    }

    pub fn diffuse(&self, uv: DVec2) -> Color {
        match &self.diffuse_texture {
            Some(tex) => tex.sample(uv),
            None => self.diffuse_color,
        }
    }

    /// Tangent-space normal in [0, 1] encoding, if the material has a
    /// normal map.
    pub fn normal(&self, uv: DVec2) -> Option<DVec3> {
        self.normal_texture.as_ref().map(|tex| tex.sample(uv))
    }

    pub fn roughness(&self, uv: DVec2) -> f64 {
        match &self.roughness_texture {
            Some(tex) => tex.sample_channel(uv, 1),
            None => self.roughness,
        }
    }

    pub fn metalness(&self, uv: DVec2) -> f64 {
        match &self.metalness_texture {
            Some(tex) => tex.sample_channel(uv, 2),
            None => self.metalness,
        }
    }

    pub fn emissive(&self, uv: DVec2) -> Color {
        match &self.emissive_texture {
            Some(tex) => tex.sample(uv),
            None => self.emissive_color,
        }
    }

    pub fn emissive_intensity(&self, _uv: DVec2) -> f64 {
        self.emissive_intensity
    }

    /// Check if this material is emissive.
    pub fn is_emissive(&self) -> bool {
        self.emissive_intensity > 0.0
            && (self.emissive_color.max_element() > 0.0 || self.emissive_texture.is_some())
    }

    /// Check if this material uses any textures.
    pub fn has_textures(&self) -> bool {
        self.diffuse_texture.is_some()
            || self.normal_texture.is_some()
            || self.roughness_texture.is_some()
            || self.metalness_texture.is_some()
            || self.emissive_texture.is_some()
    }
}
