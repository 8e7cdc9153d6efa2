//! The per-frame driver.
//!
//! One call to [`FrameDriver::frame`] is one iteration of the animation loop:
//!
//! 1. emit the warm-up trickle while it is active
//! 2. drain pending emissions in arrival order
//! 3. run the physics step
//! 4. publish the result
//!
//! Input handlers queue emissions between frames; nothing touches the grids
//! outside of `frame`, so emission never overlaps a step or a publish.

use std::collections::VecDeque;
use std::time::Duration;

use glam::UVec2;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::{SimulationConfig, Warmup};
use crate::emission::EmissionRequest;
use crate::error::LayoutError;
use crate::input::{HandSample, PointerEvent, RateLimiter};
use crate::substrate::{CpuSubstrate, Substrate};
use crate::system::ParticleSystem;
use crate::time::Time;

/// What one frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    pub frame: u64,
    /// Particles emitted this frame, warm-up included.
    pub emitted: u64,
    pub requests: usize,
}

pub struct FrameDriver<S: Substrate> {
    system: ParticleSystem<S>,
    time: Time,
    warmup: Warmup,
    pending: VecDeque<EmissionRequest>,
    limiter: RateLimiter,
    input_budget: u32,
    rng: SmallRng,
}

impl FrameDriver<CpuSubstrate> {
    pub fn cpu(config: &SimulationConfig) -> Result<Self, LayoutError> {
        Ok(Self::new(ParticleSystem::cpu(config)?, config))
    }
}

impl<S: Substrate> FrameDriver<S> {
    pub fn new(system: ParticleSystem<S>, config: &SimulationConfig) -> Self {
        Self {
            system,
            time: Time::new(),
            warmup: config.warmup,
            pending: VecDeque::new(),
            limiter: RateLimiter::new(config.rate_limit.as_secs_f64() * 1000.0),
            input_budget: config.input_budget,
            rng: SmallRng::seed_from_u64(config.resolve_seed().rotate_left(17)),
        }
    }

    #[inline]
    pub fn system(&self) -> &ParticleSystem<S> {
        &self.system
    }

    #[inline]
    pub fn system_mut(&mut self) -> &mut ParticleSystem<S> {
        &mut self.system
    }

    #[inline]
    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Requests waiting for the next frame.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue an emission for the next frame.
    pub fn queue_emit(&mut self, request: EmissionRequest) {
        self.pending.push_back(request);
    }

    /// Queue the emissions for one pointer event, unless it arrives within the rate limit.
    ///
    /// Returns whether the event was accepted.
    pub fn pointer_event(&mut self, event: &PointerEvent, viewport: UVec2) -> bool {
        if event.positions.is_empty() || !self.limiter.try_accept(self.time.elapsed_ms()) {
            return false;
        }
        self.pending.extend(event.requests(viewport, self.input_budget));
        true
    }

    /// Queue one emission per fingertip. Hand tracking is not rate limited.
    pub fn hand_event(&mut self, samples: &[HandSample]) {
        for sample in samples {
            let request = sample.request(&mut self.rng);
            self.pending.push_back(request);
        }
    }

    /// Advance the clock by the wall-clock frame time and run one frame.
    pub fn frame(&mut self) -> FrameReport {
        self.time.tick();
        self.run_frame()
    }

    /// Advance the clock by exactly `delta` and run one frame.
    pub fn frame_with_delta(&mut self, delta: Duration) -> FrameReport {
        self.time.advance_by(delta);
        self.run_frame()
    }

    fn run_frame(&mut self) -> FrameReport {
        let elapsed = self.time.elapsed_ms();
        let mut report = FrameReport {
            frame: self.time.frame(),
            ..Default::default()
        };

        if self.warmup.is_active(elapsed) {
            self.system
                .emit(self.warmup.count, Warmup::origin(elapsed), glam::Vec3::ZERO);
            report.emitted += self.warmup.count as u64;
        }

        while let Some(request) = self.pending.pop_front() {
            self.system.emit_request(&request);
            report.emitted += request.count as u64;
            report.requests += 1;
        }

        self.system.advance();

        log::trace!(
            "frame {} at {:.1} ms: {} emitted from {} requests, cursor {}",
            report.frame,
            elapsed,
            report.emitted,
            report.requests,
            self.system.cursor().index()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    const FRAME: Duration = Duration::from_millis(16);

    fn config() -> SimulationConfig {
        SimulationConfig::new().with_capacity(64 * 64).with_seed(11)
    }

    #[test]
    fn test_warmup_trickle_stops() {
        let mut driver = FrameDriver::cpu(&config()).unwrap();
        let mut warm_frames = 0;
        for _ in 0..250 {
            if driver.frame_with_delta(FRAME).emitted > 0 {
                warm_frames += 1;
            }
        }
        // Frames at 16, 32, ..., 2992 ms
        assert_eq!(warm_frames, 187);
        assert_eq!(driver.system().steps(), 250);
    }

    #[test]
    fn test_pending_drained_in_order() {
        let mut driver = FrameDriver::cpu(&config().without_warmup()).unwrap();
        driver.queue_emit(EmissionRequest::at(3, Vec3::new(0.5, 0.0, 0.0)));
        driver.queue_emit(EmissionRequest::at(2, Vec3::new(-0.5, 0.0, 0.0)));
        let report = driver.frame_with_delta(FRAME);
        assert_eq!(report.requests, 2);
        assert_eq!(report.emitted, 5);
        assert_eq!(driver.pending(), 0);

        let grid = driver.system().current_state_grid();
        assert!(grid.particle(0).position.x > 0.3);
        assert!(grid.particle(4).position.x < -0.3);
        assert_eq!(driver.system().cursor().index(), 5);
    }

    #[test]
    fn test_pointer_rate_limit() {
        let mut driver = FrameDriver::cpu(&config().without_warmup()).unwrap();
        let viewport = UVec2::new(640, 480);
        let event = PointerEvent::single(Vec2::new(320.0, 240.0));

        assert!(driver.pointer_event(&event, viewport));
        assert!(!driver.pointer_event(&event, viewport));
        driver.frame_with_delta(Duration::from_millis(10));
        assert!(!driver.pointer_event(&event, viewport));
        driver.frame_with_delta(Duration::from_millis(10));
        assert!(driver.pointer_event(&event, viewport));
        assert_eq!(driver.system().cursor().index(), 1000);
    }

    #[test]
    fn test_hand_event_queues_one_per_finger() {
        let mut driver = FrameDriver::cpu(&config().without_warmup()).unwrap();
        let sample = HandSample {
            tip_position: Vec3::ZERO,
            tip_velocity: Vec3::ZERO,
        };
        driver.hand_event(&[sample, sample]);
        assert_eq!(driver.pending(), 2);
        let report = driver.frame_with_delta(FRAME);
        assert!((220..400).contains(&report.emitted));
    }
}
