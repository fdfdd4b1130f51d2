//! Render progress and time estimation.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Snapshot of an in-flight or finished render.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderStats {
    /// Seconds since the render started
    pub elapsed: f64,
    /// Estimated seconds left, never negative
    pub remaining: f64,
    pub current_chunk: usize,
    pub total_chunks: usize,
}

impl RenderStats {
    /// Completed fraction in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_chunks == 0 {
            0.0
        } else {
            self.current_chunk as f64 / self.total_chunks as f64
        }
    }
}

#[derive(Debug)]
struct Timing {
    start: Instant,
    estimated_end: Instant,
    stopped_at: Option<Instant>,
    current_chunk: usize,
    total_chunks: usize,
    running: bool,
}

/// Shared progress tracker.
///
/// Workers call [`RenderTime::update`] while another thread polls
/// [`RenderTime::stats`].
#[derive(Debug)]
pub struct RenderTime {
    timing: Mutex<Timing>,
}

impl Default for RenderTime {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            timing: Mutex::new(Timing {
                start: now,
                estimated_end: now,
                stopped_at: None,
                current_chunk: 0,
                total_chunks: 0,
                running: false,
            }),
        }
    }
}

impl RenderTime {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Timing> {
        // A panicking worker cannot leave the counters inconsistent
        self.timing.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn start(&self, total_chunks: usize) {
        let now = Instant::now();
        let mut timing = self.lock();
        timing.start = now;
        timing.estimated_end = now;
        timing.stopped_at = None;
        timing.current_chunk = 0;
        timing.total_chunks = total_chunks;
        timing.running = true;
    }

    pub fn stop(&self) {
        let mut timing = self.lock();
        timing.running = false;
        timing.stopped_at = Some(Instant::now());
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Record progress and re-estimate the end time.
    ///
    /// Workers report out of order, so progress only moves forward; values
    /// past the total are ignored.
    pub fn update(&self, current_chunk: usize) {
        let mut timing = self.lock();
        if current_chunk <= timing.total_chunks && current_chunk > timing.current_chunk {
            timing.current_chunk = current_chunk;
        }
        if !timing.running || timing.total_chunks == 0 {
            return;
        }

        let progress = timing.current_chunk as f64 / timing.total_chunks as f64;
        if progress > 0.0 {
            let elapsed = timing.start.elapsed().as_secs_f64();
            let total = Duration::from_secs_f64(elapsed / progress);
            timing.estimated_end = timing.start + total;
        }
    }

    pub fn stats(&self) -> RenderStats {
        let timing = self.lock();
        let now = timing.stopped_at.unwrap_or_else(Instant::now);

        RenderStats {
            elapsed: now.duration_since(timing.start).as_secs_f64(),
            remaining: timing.estimated_end.saturating_duration_since(now).as_secs_f64(),
            current_chunk: timing.current_chunk,
            total_chunks: timing.total_chunks,
        }
    }
}
