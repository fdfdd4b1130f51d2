//! Textures sampled by materials and the skybox.
//!
//! Decoding image files is left to collaborators; they hand over either
//! linear float pixels or 8-bit sRGB bytes.

use lux_math::{DVec2, DVec3};
use thiserror::Error;

/// Errors that can occur while building a texture.
#[derive(Error, Debug, PartialEq)]
pub enum TextureError {
    #[error("Texture dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },

    #[error("Expected {expected} pixels for the texture dimensions, got {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A texture with pixel data.
///
/// Stores pixels in linear RGBA float format for rendering.
#[derive(Clone, Debug)]
pub struct Texture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    /// Pixel data in RGBA format (linear, 0-1 range)
    /// Stored as [R, G, B, A] per pixel, row-major order, top row first
    pub pixels: Vec<[f32; 4]>,

    /// Name for diagnostics (usually the source path)
    pub name: String,
}

impl Texture {
    /// Create a new texture from linear pixel data.
    pub fn new(
        width: u32,
        height: u32,
        pixels: Vec<[f32; 4]>,
        name: impl Into<String>,
    ) -> TextureResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::EmptyDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(TextureError::PixelCountMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        let texture = Self {
            width,
            height,
            pixels,
            name: name.into(),
        };
        log::debug!(
            "Created texture: {} ({}x{}, {:.1} KB)",
            texture.name,
            texture.width,
            texture.height,
            texture.size_bytes() as f32 / 1024.0
        );
        Ok(texture)
    }

    /// Create a texture from 8-bit sRGB RGBA bytes, converting to linear.
    pub fn from_srgb8(
        width: u32,
        height: u32,
        rgba: &[u8],
        name: impl Into<String>,
    ) -> TextureResult<Self> {
        let expected = width as usize * height as usize;
        if rgba.len() != expected * 4 {
            return Err(TextureError::PixelCountMismatch {
                expected,
                actual: rgba.len() / 4,
            });
        }

        let pixels = rgba
            .chunks_exact(4)
            .map(|p| {
                [
                    srgb_to_linear(p[0]),
                    srgb_to_linear(p[1]),
                    srgb_to_linear(p[2]),
                    p[3] as f32 / 255.0, // Alpha is linear
                ]
            })
            .collect();

        Self::new(width, height, pixels, name)
    }

    /// Create a solid color texture (1x1).
    pub fn solid_color(color: DVec3) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![[color.x as f32, color.y as f32, color.z as f32, 1.0]],
            name: "<solid>".to_string(),
        }
    }

    /// Sample the RGB channels at UV coordinates (bilinear filtering).
    ///
    /// UV coordinates wrap, with (0, 0) at bottom-left.
    pub fn sample(&self, uv: DVec2) -> DVec3 {
        let (x0, y0, x1, y1, fx, fy) = self.bilinear_taps(uv);

        let p00 = self.get_pixel(x0, y0);
        let p10 = self.get_pixel(x1, y0);
        let p01 = self.get_pixel(x0, y1);
        let p11 = self.get_pixel(x1, y1);

        let lerp_row = |a: [f32; 4], b: [f32; 4]| {
            DVec3::new(a[0] as f64, a[1] as f64, a[2] as f64) * (1.0 - fx)
                + DVec3::new(b[0] as f64, b[1] as f64, b[2] as f64) * fx
        };

        lerp_row(p00, p10) * (1.0 - fy) + lerp_row(p01, p11) * fy
    }

    /// Sample a single channel (for roughness/metallic maps).
    pub fn sample_channel(&self, uv: DVec2, channel: usize) -> f64 {
        let (x0, y0, x1, y1, fx, fy) = self.bilinear_taps(uv);
        let c = channel.min(3);

        let top = self.get_pixel(x0, y0)[c] as f64 * (1.0 - fx) + self.get_pixel(x1, y0)[c] as f64 * fx;
        let bottom =
            self.get_pixel(x0, y1)[c] as f64 * (1.0 - fx) + self.get_pixel(x1, y1)[c] as f64 * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Integer taps and fractional weights for bilinear filtering.
    fn bilinear_taps(&self, uv: DVec2) -> (u32, u32, u32, u32, f64, f64) {
        // Wrap UV coordinates
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);

        // Convert to pixel coordinates
        let x = u * (self.width as f64 - 1.0);
        let y = (1.0 - v) * (self.height as f64 - 1.0); // Flip V for image coordinates

        let x0 = (x.floor() as u32).min(self.width - 1);
        let y0 = (y.floor() as u32).min(self.height - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        (x0, y0, x1, y1, x.fract(), y.fract())
    }

    /// Get pixel at integer coordinates.
    fn get_pixel(&self, x: u32, y: u32) -> [f32; 4] {
        let idx = (y * self.width + x) as usize;
        self.pixels
            .get(idx)
            .copied()
            .unwrap_or([0.0, 0.0, 0.0, 1.0])
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<[f32; 4]>()
    }
}

/// Convert sRGB byte value to linear float.
pub fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}
