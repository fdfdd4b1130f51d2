//! Frame orchestration.
//!
//! A frame is a list of chunks (see [`crate::chunk`]). Workers take
//! chunks in order from a shared counter and accumulate into a buffer
//! they own; buffers are summed into the framebuffer once every worker
//! has finished.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use lux_core::Scene;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::camera_ray::CameraRayEmitter;
use crate::chunk::{generate_chunks, Chunk, CHUNK_COUNT_UPDATE_INTERVAL};
use crate::error::{RenderError, RenderResult};
use crate::framebuffer::Framebuffer;
use crate::integrator::PathTracer;
use crate::render_time::RenderTime;
use crate::sampler::collect_light_samples;
use crate::settings::{RenderMode, RenderSettings};

/// How chunks are dispatched for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    /// Every chunk in order on the calling thread
    SingleThreaded,
    /// A rayon pool of `thread_count` workers, one buffer each
    MultiThreadedCpu { thread_count: usize },
}

impl RenderStrategy {
    pub fn from_settings(settings: &RenderSettings) -> Self {
        match settings.render_mode {
            RenderMode::SingleThreaded => RenderStrategy::SingleThreaded,
            RenderMode::MultiThreadedCpu => RenderStrategy::MultiThreadedCpu {
                thread_count: settings.thread_count.max(1),
            },
        }
    }

    pub fn thread_count(&self) -> usize {
        match *self {
            RenderStrategy::SingleThreaded => 1,
            RenderStrategy::MultiThreadedCpu { thread_count } => thread_count,
        }
    }
}

/// Outcome of [`Renderer::render_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Completed,
    /// Stopped through the stop handle; partial results were discarded and
    /// the framebuffer still holds the previous frame
    Cancelled,
}

/// Per-frame state shared read-only by every worker.
struct FrameContext<'a> {
    tracer: PathTracer<'a>,
    emitter: CameraRayEmitter,
    seed: u64,
    width: u32,
    height: u32,
    cell_size: f64,
    sample_weight: f64,
    chunks_per_pass: usize,
    samples_per_pixel: u32,
}

/// Offline renderer.
///
/// Owns the settings, the output framebuffer and the progress tracker.
/// The scene is borrowed for the duration of one frame only.
#[derive(Debug)]
pub struct Renderer {
    settings: RenderSettings,
    framebuffer: Framebuffer,
    render_time: Arc<RenderTime>,
    stop_requested: Arc<AtomicBool>,
}

impl Renderer {
    pub fn new(settings: RenderSettings) -> Self {
        let framebuffer = Framebuffer::new(settings.width, settings.height, settings.channel_count);
        Self {
            settings,
            framebuffer,
            render_time: Arc::new(RenderTime::new()),
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Replace the settings, resizing the framebuffer if needed.
    pub fn set_settings(&mut self, settings: RenderSettings) {
        self.framebuffer
            .resize(settings.width, settings.height, settings.channel_count);
        self.settings = settings;
    }

    /// Accumulated linear radiance of the last completed frame.
    ///
    /// Only a completed frame replaces it.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Progress tracker, readable from other threads while rendering.
    pub fn render_time(&self) -> Arc<RenderTime> {
        Arc::clone(&self.render_time)
    }

    /// Flag that cancels the frame in flight when set.
    ///
    /// The flag is cleared at the start of every frame.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_requested)
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Relaxed);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Relaxed)
    }

    /// A scene can be rendered once it has a camera.
    pub fn is_ready_to_render(&self, scene: &Scene) -> bool {
        if scene.camera.is_none() {
            log::warn!("No camera set in the scene. Cannot render frame.");
            return false;
        }
        true
    }

    /// Render one frame of `scene` into the framebuffer.
    pub fn render_frame(&mut self, scene: &Scene) -> RenderResult<RenderStatus> {
        if self.settings.width == 0 || self.settings.height == 0 {
            return Err(RenderError::EmptyImage {
                width: self.settings.width,
                height: self.settings.height,
            });
        }
        if !self.is_ready_to_render(scene) {
            return Err(RenderError::NotReady);
        }
        let Some(camera) = scene.camera.as_ref() else {
            return Err(RenderError::NotReady);
        };

        let settings = self.settings.clone().sanitized();
        let strategy = RenderStrategy::from_settings(&settings);
        self.stop_requested.store(false, Ordering::Relaxed);

        let light_samples = collect_light_samples(scene);
        let chunks = generate_chunks(
            settings.width,
            settings.height,
            settings.chunk_size,
            settings.samples_per_pixel,
        );

        let context = FrameContext {
            tracer: PathTracer::new(scene, &light_samples, &settings),
            emitter: CameraRayEmitter::new(camera, settings.aspect_ratio()),
            seed: settings.seed,
            width: settings.width,
            height: settings.height,
            cell_size: 1.0 / settings.samples_per_row() as f64,
            sample_weight: 1.0 / settings.samples_per_pixel as f64,
            chunks_per_pass: (chunks.len() / settings.samples_per_pixel as usize).max(1),
            samples_per_pixel: settings.samples_per_pixel,
        };

        log::info!(
            "Rendering {}x{} at {} spp, {} chunks, {:?} on {} thread(s)",
            settings.width,
            settings.height,
            settings.samples_per_pixel,
            chunks.len(),
            settings.render_mode,
            strategy.thread_count()
        );

        self.render_time.start(chunks.len());
        let mut output = Framebuffer::new(settings.width, settings.height, settings.channel_count);
        let mut buffers = output.thread_buffers(strategy.thread_count());

        match strategy {
            RenderStrategy::SingleThreaded => {
                self.render_single_threaded(&context, &chunks, &mut buffers[0]);
            }
            RenderStrategy::MultiThreadedCpu { thread_count } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(thread_count)
                    .build()?;
                self.render_multi_threaded(&pool, &context, &chunks, &mut buffers);
            }
        }

        if self.is_stop_requested() {
            self.render_time.stop();
            log::warn!("Render cancelled by user.");
            return Ok(RenderStatus::Cancelled);
        }

        output.reduce_thread_buffers(&mut buffers);
        self.framebuffer = output;
        self.render_time.update(chunks.len());
        self.render_time.stop();

        log::info!("Render finished in {:.2}s", self.render_time.stats().elapsed);
        Ok(RenderStatus::Completed)
    }

    fn render_single_threaded(&self, context: &FrameContext, chunks: &[Chunk], buffer: &mut Framebuffer) {
        for chunk in chunks {
            if self.is_stop_requested() {
                return;
            }
            render_chunk(context, chunk, buffer);

            let done = chunk.index + 1;
            if done % CHUNK_COUNT_UPDATE_INTERVAL == 0 {
                self.render_time.update(done);
            }
            if done % context.chunks_per_pass == 0 {
                log::debug!("Sample: {}/{}", chunk.sample + 1, context.samples_per_pixel);
            }
        }
    }

    fn render_multi_threaded(
        &self,
        pool: &rayon::ThreadPool,
        context: &FrameContext,
        chunks: &[Chunk],
        buffers: &mut [Framebuffer],
    ) {
        let next_chunk = AtomicUsize::new(0);
        let stop = &*self.stop_requested;
        let render_time = &*self.render_time;
        let next_chunk = &next_chunk;

        pool.scope(|scope| {
            for buffer in buffers.iter_mut() {
                scope.spawn(move |_| loop {
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }
                    let index = next_chunk.fetch_add(1, Ordering::Relaxed);
                    if index % CHUNK_COUNT_UPDATE_INTERVAL == 0 {
                        render_time.update(index);
                    }
                    let Some(chunk) = chunks.get(index) else {
                        return;
                    };

                    render_chunk(context, chunk, buffer);
                    if index % context.chunks_per_pass == 0 {
                        log::debug!("Sample: {}/{}", chunk.sample + 1, context.samples_per_pixel);
                    }
                });
            }
        });
    }
}

/// Seed of the random stream owned by one chunk.
fn chunk_seed(seed: u64, chunk_index: usize) -> u64 {
    seed ^ (chunk_index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Trace one jittered sample per pixel of `chunk` into `buffer`.
fn render_chunk(context: &FrameContext, chunk: &Chunk, buffer: &mut Framebuffer) {
    let mut rng = StdRng::seed_from_u64(chunk_seed(context.seed, chunk.index));
    let (grid_x, grid_y) = chunk.subpixel_grid_pos;
    let inv_width = 1.0 / context.width as f64;
    let inv_height = 1.0 / context.height as f64;

    for (x, y) in chunk.pixels() {
        let jitter_x: f64 = rng.gen();
        let jitter_y: f64 = rng.gen();
        let u = (x as f64 + (grid_x as f64 + jitter_x) * context.cell_size) * inv_width;
        let v = (y as f64 + (grid_y as f64 + jitter_y) * context.cell_size) * inv_height;

        let ray = context.emitter.generate_ray(u, v, &mut rng);
        let color = context.tracer.trace(&ray, &mut rng);
        buffer.set_pixel_color(x, y, color.extend(1.0), context.sample_weight);
    }
}
