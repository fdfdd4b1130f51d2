//! Linear floating-point accumulation buffer.

use lux_math::{Color, ColorRgba, DVec3};

use crate::tone_mapping::{linear_to_srgb, ToneMapping};

/// Grayscale weights used when writing into a single-channel buffer.
const GRAYSCALE_WEIGHTS: DVec3 = DVec3::new(0.299, 0.587, 0.114);

/// Scale from `[0, 1]` to 8-bit so that 1.0 lands on 255.
const NORMALIZED_TO_COLOR8: f64 = 255.999;

/// `width * height * channels` doubles in row-major order, top row first.
///
/// Writes always add `color * weight`; nothing ever overwrites a pixel,
/// so the order in which samples arrive does not matter.
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<f64>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0.0; buffer_len(width, height, channels)],
        }
    }

    /// Reallocate when the properties change; keeps the content otherwise.
    pub fn resize(&mut self, width: u32, height: u32, channels: u32) {
        if self.width != width || self.height != height || self.channels != channels {
            *self = Self::new(width, height, channels);
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Raw bytes of the linear buffer, native endianness.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Channel values of one pixel, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[f64]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = self.index(x, y);
        Some(&self.data[index..index + self.channels as usize])
    }

    /// Add `color * weight` to a pixel.
    ///
    /// One channel stores grayscale, three store RGB and four store RGBA.
    /// Out-of-range pixels and other channel counts are skipped with a
    /// warning.
    pub fn set_pixel_color(&mut self, x: u32, y: u32, color: ColorRgba, weight: f64) {
        if x >= self.width || y >= self.height {
            log::warn!("Pixel coordinates out of bounds: ({x}, {y})");
            return;
        }
        let index = self.index(x, y);

        match self.channels {
            1 => {
                self.data[index] += color.truncate().dot(GRAYSCALE_WEIGHTS) * weight;
            }
            3 => {
                for (offset, value) in color.truncate().to_array().into_iter().enumerate() {
                    self.data[index + offset] += value * weight;
                }
            }
            4 => {
                for (offset, value) in color.to_array().into_iter().enumerate() {
                    self.data[index + offset] += value * weight;
                }
            }
            other => {
                log::warn!("Unsupported channel count: {other}. Supported counts are 1, 3, or 4.");
            }
        }
    }

    /// Empty buffers with the same shape, one per worker.
    pub fn thread_buffers(&self, count: usize) -> Vec<Framebuffer> {
        (0..count)
            .map(|_| Framebuffer::new(self.width, self.height, self.channels))
            .collect()
    }

    /// Sum `other` into this buffer. Shapes must match; a mismatch is
    /// logged and ignored.
    pub fn accumulate(&mut self, other: &Framebuffer) {
        if self.data.len() != other.data.len() || self.channels != other.channels {
            log::warn!(
                "Framebuffer shape mismatch: {}x{}x{} vs {}x{}x{}",
                self.width,
                self.height,
                self.channels,
                other.width,
                other.height,
                other.channels
            );
            return;
        }
        for (dst, src) in self.data.iter_mut().zip(&other.data) {
            *dst += *src;
        }
    }

    /// Sum every worker buffer into this one and clear them.
    pub fn reduce_thread_buffers(&mut self, buffers: &mut [Framebuffer]) {
        for buffer in buffers.iter_mut() {
            self.accumulate(buffer);
            buffer.clear();
        }
    }

    /// Apply the sRGB transfer function to the color channels in place.
    pub fn convert_to_srgb(&mut self) {
        let channels = self.channels as usize;
        let color_channels = channels.min(3);
        for pixel in self.data.chunks_exact_mut(channels.max(1)) {
            for value in &mut pixel[..color_channels] {
                *value = linear_to_srgb(*value);
            }
        }
    }

    /// Tone-mapped, sRGB-encoded RGBA8 pixels for display.
    pub fn to_rgba8(&self, tone_mapping: &ToneMapping) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        let channels = self.channels as usize;

        for pixel in self.data.chunks_exact(channels.max(1)) {
            let (color, alpha) = match channels {
                1 => (Color::splat(pixel[0]), 1.0),
                3 => (Color::new(pixel[0], pixel[1], pixel[2]), 1.0),
                4 => (Color::new(pixel[0], pixel[1], pixel[2]), pixel[3]),
                _ => (Color::ZERO, 1.0),
            };

            let mapped = tone_mapping.apply(color);
            for value in mapped.to_array() {
                out.push(to_color8(linear_to_srgb(value)));
            }
            out.push(to_color8(alpha));
        }

        out
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels as usize
    }
}

fn buffer_len(width: u32, height: u32, channels: u32) -> usize {
    width as usize * height as usize * channels as usize
}

fn to_color8(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * NORMALIZED_TO_COLOR8) as u8
}
