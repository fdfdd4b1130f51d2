//! HDR to display conversion.
//!
//! Tone mapping compresses linear radiance into `[0, 1]`; the sRGB
//! transfer function is applied afterwards by the caller (see
//! [`crate::Framebuffer::to_rgba8`]).

use lux_math::{Color, DMat3, DVec3};
use serde::{Deserialize, Serialize};

const SRGB_GAMMA: f64 = 2.4;
const SRGB_LINEAR_THRESHOLD: f64 = 0.0031308;
const SRGB_ENCODED_THRESHOLD: f64 = 0.04045;
const SRGB_LINEAR_SLOPE: f64 = 12.92;
const SRGB_SCALE: f64 = 1.055;
const SRGB_OFFSET: f64 = 0.055;

pub const MIN_EXPOSURE: f64 = 0.0;
pub const MAX_EXPOSURE: f64 = 10.0;

/// Rec. 709 relative luminance.
#[inline]
pub fn luminance(color: Color) -> f64 {
    color.dot(DVec3::new(0.2126, 0.7152, 0.0722))
}

/// sRGB transfer function (encode).
pub fn linear_to_srgb(value: f64) -> f64 {
    if value <= SRGB_LINEAR_THRESHOLD {
        value * SRGB_LINEAR_SLOPE
    } else {
        value.powf(1.0 / SRGB_GAMMA) * SRGB_SCALE - SRGB_OFFSET
    }
}

/// Inverse sRGB transfer function (decode).
pub fn srgb_to_linear(value: f64) -> f64 {
    if value <= SRGB_ENCODED_THRESHOLD {
        value / SRGB_LINEAR_SLOPE
    } else {
        ((value + SRGB_OFFSET) / SRGB_SCALE).powf(SRGB_GAMMA)
    }
}

/// Tone mapping operator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ToneMapping {
    /// Clamp to `[0, 1]`
    #[default]
    None,
    /// `x / (1 + x)` per channel
    Reinhard,
    /// Blend of luminance and per-channel Reinhard, leaning per-channel as
    /// each channel brightens
    LuminanceReinhard,
    /// Luminance-driven Reinhard where `white` maps to one
    WhitePointReinhard(f64),
    /// `1 - exp(-x * exposure)` per channel
    Exposure(f64),
    /// Fitted ACES RRT + ODT
    Aces,
    /// Hable filmic curve
    Uncharted2 { exposure: f64, white_point: f64 },
}

impl ToneMapping {
    /// Map a linear color into `[0, 1]`.
    pub fn apply(&self, color: Color) -> Color {
        let mapped = match *self {
            ToneMapping::None => color,
            ToneMapping::Reinhard => color.max(Color::ZERO) / (Color::ONE + color.max(Color::ZERO)),
            ToneMapping::LuminanceReinhard => {
                let color = color.max(Color::ZERO);
                let by_luminance = color / (1.0 + luminance(color));
                let by_channel = color / (Color::ONE + color);
                // Per-channel lerp weighted by the per-channel result itself
                by_luminance + (by_channel - by_luminance) * by_channel
            }
            ToneMapping::WhitePointReinhard(white) => {
                let lum = luminance(color).max(0.0);
                let white = white.max(1e-6);
                color * (1.0 + lum / (white * white)) / (1.0 + lum)
            }
            ToneMapping::Exposure(exposure) => {
                let exposure = exposure.clamp(MIN_EXPOSURE, MAX_EXPOSURE);
                Color::ONE - (-color * exposure).exp()
            }
            ToneMapping::Aces => aces_fitted(color),
            ToneMapping::Uncharted2 {
                exposure,
                white_point,
            } => {
                let white_scale = 1.0 / uncharted2_partial(white_point);
                uncharted2_curve(color * exposure) * white_scale
            }
        };
        mapped.clamp(Color::ZERO, Color::ONE)
    }
}

// sRGB => XYZ => D65_2_D60 => AP1 => RRT_SAT, stored column-major
const ACES_INPUT: DMat3 = DMat3::from_cols_array(&[
    0.59719, 0.07600, 0.02840, //
    0.35458, 0.90834, 0.13383, //
    0.04823, 0.01566, 0.83777,
]);

// ODT_SAT => XYZ => D60_2_D65 => sRGB
const ACES_OUTPUT: DMat3 = DMat3::from_cols_array(&[
    1.60475, -0.10208, -0.00327, //
    -0.53108, 1.10813, -0.07276, //
    -0.07367, -0.00605, 1.07602,
]);

fn aces_fitted(color: Color) -> Color {
    let v = ACES_INPUT * color;
    let a = v * (v + 0.0245786) - 0.000090537;
    let b = v * (v * 0.983729 + 0.4329510) + 0.238081;
    ACES_OUTPUT * (a / b)
}

const A: f64 = 0.15;
const B: f64 = 0.50;
const C: f64 = 0.10;
const D: f64 = 0.20;
const E: f64 = 0.02;
const F: f64 = 0.30;

fn uncharted2_partial(x: f64) -> f64 {
    (x * (A * x + C * B) + D * E) / (x * (A * x + B) + D * F) - E / F
}

fn uncharted2_curve(color: Color) -> Color {
    Color::new(
        uncharted2_partial(color.x),
        uncharted2_partial(color.y),
        uncharted2_partial(color.z),
    )
}
