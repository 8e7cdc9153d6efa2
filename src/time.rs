//! Frame clock for the driver.
//!
//! The driver keys the warm-up trickle and the input rate limit off simulated
//! milliseconds, so the clock can be fed either from the wall clock (the window
//! host) or manually (tests, headless runs):
//!
//! ```ignore
//! let mut time = Time::new();
//!
//! // Once per displayed frame:
//! time.tick();
//!
//! // Or deterministically:
//! time.advance_by(Duration::from_millis(16));
//! ```

use std::time::{Duration, Instant};

/// Elapsed simulated time, frame count and a smoothed FPS estimate.
#[derive(Debug)]
pub struct Time {
    last_tick: Instant,
    /// Simulated milliseconds since start.
    elapsed_ms: f64,
    /// Milliseconds covered by the last frame.
    delta_ms: f64,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_window_ms: f64,
    fps_update_interval_ms: f64,
    /// If set, every tick advances by exactly this much regardless of the wall clock.
    fixed_delta: Option<Duration>,
}

impl Time {
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            elapsed_ms: 0.0,
            delta_ms: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_window_ms: 0.0,
            fps_update_interval_ms: 500.0,
            fixed_delta: None,
        }
    }

    /// A clock that advances by `delta` on every [`tick`](Self::tick).
    pub fn fixed(delta: Duration) -> Self {
        let mut time = Self::new();
        time.set_fixed_delta(Some(delta));
        time
    }

    /// Advance by the wall-clock time since the last tick (or the fixed delta).
    pub fn tick(&mut self) {
        let now = Instant::now();
        let delta = self
            .fixed_delta
            .unwrap_or_else(|| now.duration_since(self.last_tick));
        self.last_tick = now;
        self.advance_by(delta);
    }

    /// Advance by exactly `delta` and count one frame.
    pub fn advance_by(&mut self, delta: Duration) {
        self.delta_ms = delta.as_secs_f64() * 1000.0;
        self.elapsed_ms += self.delta_ms;
        self.frame_count += 1;

        self.fps_window_ms += self.delta_ms;
        if self.fps_window_ms >= self.fps_update_interval_ms {
            let frames = self.frame_count - self.fps_frame_count;
            self.fps = (frames as f64 * 1000.0 / self.fps_window_ms) as f32;
            self.fps_frame_count = self.frame_count;
            self.fps_window_ms = 0.0;
        }
    }

    /// Simulated milliseconds since start.
    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    #[inline]
    pub fn delta_ms(&self) -> f64 {
        self.delta_ms
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, refreshed every half second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn set_fixed_delta(&mut self, delta: Option<Duration>) {
        self.fixed_delta = delta;
    }

    pub fn reset(&mut self) {
        *self = Self {
            fixed_delta: self.fixed_delta,
            ..Self::new()
        };
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
