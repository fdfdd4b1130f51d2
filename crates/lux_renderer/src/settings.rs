//! Render configuration.

use lux_core::Camera;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const MAX_IMAGE_DIMENSION: u32 = 16384;
pub const DEFAULT_CHANNEL_COUNT: u32 = 3;
pub const MAX_CHANNEL_COUNT: u32 = 4;
pub const MAX_SAMPLES_PER_PIXEL: u32 = 1024;
/// Russian roulette ends nearly every path long before this.
pub const DEFAULT_MAX_BOUNCES: u32 = 128;
pub const MAX_BOUNCES_LIMIT: u32 = 1024;
pub const DEFAULT_NEAR_PLANE: f64 = 0.1;
pub const DEFAULT_FAR_PLANE: f64 = 100.0;

/// Pixels per chunk side.
pub const DEFAULT_CHUNK_SIZE: u32 = 256;
pub const MIN_CHUNK_SIZE: u32 = 1;
pub const MAX_CHUNK_SIZE: u32 = 1024;

/// How chunks are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    SingleThreaded,
    #[default]
    MultiThreadedCpu,
}

/// Render configuration.
///
/// Fields are public for struct-literal construction; the setters apply
/// the clamps and [`RenderSettings::sanitized`] re-applies them to values
/// that came from elsewhere (e.g. deserialization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// 1 (grayscale), 3 (RGB) or 4 (RGBA)
    pub channel_count: u32,
    /// Always a perfect square once sanitized
    pub samples_per_pixel: u32,
    pub max_bounces: u32,
    /// Minimum distance for primary hits; `None` uses the camera's
    pub near_plane: Option<f64>,
    /// Maximum distance for any hit; `None` uses the camera's
    pub far_plane: Option<f64>,
    pub render_mode: RenderMode,
    /// Worker count for `RenderMode::MultiThreadedCpu`
    pub thread_count: usize,
    /// Side of a square chunk in pixels
    pub chunk_size: u32,
    /// Base seed of the per-chunk random streams
    pub seed: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            channel_count: DEFAULT_CHANNEL_COUNT,
            samples_per_pixel: 1,
            max_bounces: DEFAULT_MAX_BOUNCES,
            near_plane: None,
            far_plane: None,
            render_mode: RenderMode::default(),
            thread_count: default_thread_count(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            seed: 0,
        }
    }
}

/// Available parallelism minus two, leaving room for the UI and the OS.
pub fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(2)
        .max(1)
}

/// Clamp to `1..=1024` and snap to the nearest perfect square.
///
/// Ties go to the lower square.
pub fn round_samples_per_pixel(samples: u32) -> u32 {
    let samples = samples.clamp(1, MAX_SAMPLES_PER_PIXEL);
    let root = (samples as f64).sqrt() as u32;
    let lower = root * root;
    let upper = (root + 1) * (root + 1);

    if samples - lower <= upper - samples {
        lower.max(1)
    } else {
        upper.max(1)
    }
}

impl RenderSettings {
    pub fn new(width: u32, height: u32) -> Self {
        let mut settings = Self::default();
        settings.set_width(width);
        settings.set_height(height);
        settings
    }

    /// Re-apply every clamp.
    pub fn sanitized(mut self) -> Self {
        self.set_width(self.width);
        self.set_height(self.height);
        self.set_channel_count(self.channel_count);
        self.set_samples_per_pixel(self.samples_per_pixel);
        self.set_max_bounces(self.max_bounces);
        self.set_near_plane(self.near_plane);
        self.set_far_plane(self.far_plane);
        self.set_thread_count(self.thread_count);
        self.set_chunk_size(self.chunk_size);
        self
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width.clamp(1, MAX_IMAGE_DIMENSION);
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height.clamp(1, MAX_IMAGE_DIMENSION);
    }

    pub fn set_channel_count(&mut self, channel_count: u32) {
        self.channel_count = channel_count.clamp(1, MAX_CHANNEL_COUNT);
    }

    pub fn set_samples_per_pixel(&mut self, samples: u32) {
        self.samples_per_pixel = round_samples_per_pixel(samples);
    }

    pub fn set_max_bounces(&mut self, max_bounces: u32) {
        self.max_bounces = max_bounces.min(MAX_BOUNCES_LIMIT);
    }

    /// Override the camera's near plane. Non-finite values are dropped.
    pub fn set_near_plane(&mut self, near: Option<f64>) {
        self.near_plane = near.filter(|near| near.is_finite()).map(|near| near.max(0.0));
    }

    /// Override the camera's far plane. NaN is dropped.
    pub fn set_far_plane(&mut self, far: Option<f64>) {
        self.far_plane = far.filter(|far| !far.is_nan()).map(|far| far.max(0.0));
    }

    /// Hit distance range `(near, far)` for a frame seen through `camera`.
    ///
    /// Overrides win over the camera's planes; without either the defaults
    /// apply. The far plane never ends up in front of the near plane.
    pub fn clip_planes(&self, camera: Option<&Camera>) -> (f64, f64) {
        let near = self
            .near_plane
            .or_else(|| camera.map(|camera| camera.near_plane))
            .unwrap_or(DEFAULT_NEAR_PLANE);
        let far = self
            .far_plane
            .or_else(|| camera.map(|camera| camera.far_plane))
            .unwrap_or(DEFAULT_FAR_PLANE);
        (near, far.max(near))
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.render_mode = mode;
    }

    pub fn set_thread_count(&mut self, thread_count: usize) {
        self.thread_count = thread_count.max(1);
    }

    pub fn set_chunk_size(&mut self, chunk_size: u32) {
        self.chunk_size = chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// Sub-pixel grid cells per row.
    pub fn samples_per_row(&self) -> u32 {
        ((self.samples_per_pixel.max(1) as f64).sqrt() as u32).max(1)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}
