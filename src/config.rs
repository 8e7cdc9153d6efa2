//! Simulation configuration.
//!
//! Configure with method chaining, starting from the defaults:
//!
//! ```ignore
//! let config = SimulationConfig::new()
//!     .with_capacity(512 * 512)
//!     .with_publish_mode(PublishMode::Swap)
//!     .with_time_step(0.005)
//!     .with_seed(42);
//! ```

use std::time::Duration;

use glam::Vec3;

use crate::emission::EmissionParams;
use crate::physics::StepParams;
use crate::store::PublishMode;

/// Default capacity: 1024 * 1024 particles.
pub const DEFAULT_CAPACITY: u32 = 1024 * 1024;

/// Scripted emission during the first moments of a run, before any input arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Warmup {
    /// How long the trickle runs, in simulated time.
    pub duration: Duration,
    /// Particles emitted per frame while it runs.
    pub count: u32,
}

impl Warmup {
    /// No warm-up trickle.
    pub const NONE: Self = Self {
        duration: Duration::ZERO,
        count: 0,
    };

    /// Whether the trickle still runs at `elapsed_ms` into the simulation.
    pub fn is_active(&self, elapsed_ms: f64) -> bool {
        self.count > 0 && elapsed_ms < self.duration.as_secs_f64() * 1000.0
    }

    /// Origin of the trickle at `elapsed_ms`: a slow Lissajous sweep across the screen.
    pub fn origin(elapsed_ms: f64) -> Vec3 {
        Vec3::new(
            (-1.0 + (elapsed_ms * 0.001).sin() * 2.0) as f32,
            (-0.2 + (elapsed_ms * 0.004).cos() * 0.5) as f32,
            ((elapsed_ms * 0.015).sin() * -0.05) as f32,
        )
    }
}

impl Default for Warmup {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(3),
            count: 800,
        }
    }
}

/// Everything needed to build a [`ParticleSystem`](crate::ParticleSystem) and
/// its [`FrameDriver`](crate::FrameDriver).
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Total particle capacity. Must be a perfect square.
    pub capacity: u32,
    pub publish_mode: PublishMode,
    pub step: StepParams,
    pub emission: EmissionParams,
    pub warmup: Warmup,
    /// Particles per accepted pointer event, shared among simultaneous touches.
    pub input_budget: u32,
    /// Minimum spacing between accepted pointer events.
    pub rate_limit: Duration,
    /// RNG seed. `None` seeds from the system clock.
    pub seed: Option<u64>,
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            publish_mode: PublishMode::default(),
            step: StepParams::default(),
            emission: EmissionParams::default(),
            warmup: Warmup::default(),
            input_budget: 1000,
            rate_limit: Duration::from_millis(20),
            seed: None,
        }
    }

    /// Set the particle capacity (must be a perfect square, e.g. 1024 * 1024).
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_publish_mode(mut self, mode: PublishMode) -> Self {
        self.publish_mode = mode;
        self
    }

    /// Set the fixed per-step timestep.
    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.step.time_step = time_step;
        self
    }

    pub fn with_emission(mut self, emission: EmissionParams) -> Self {
        self.emission = emission;
        self
    }

    pub fn with_warmup(mut self, warmup: Warmup) -> Self {
        self.warmup = warmup;
        self
    }

    /// Disable the scripted warm-up trickle.
    pub fn without_warmup(self) -> Self {
        self.with_warmup(Warmup::NONE)
    }

    pub fn with_input_budget(mut self, budget: u32) -> Self {
        self.input_budget = budget;
        self
    }

    pub fn with_rate_limit(mut self, spacing: Duration) -> Self {
        self.rate_limit = spacing;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The configured seed, or one derived from the system clock.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        })
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.capacity, 1_048_576);
        assert_eq!(config.publish_mode, PublishMode::CopyBack);
        assert_eq!(config.warmup.count, 800);
        assert_eq!(config.input_budget, 1000);
        assert_eq!(config.rate_limit, Duration::from_millis(20));
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_builder_chain() {
        let config = SimulationConfig::new()
            .with_capacity(64)
            .with_publish_mode(PublishMode::Swap)
            .with_time_step(0.5)
            .without_warmup()
            .with_seed(9);
        assert_eq!(config.capacity, 64);
        assert_eq!(config.publish_mode, PublishMode::Swap);
        assert_eq!(config.step.time_step, 0.5);
        assert_eq!(config.warmup, Warmup::NONE);
        assert_eq!(config.resolve_seed(), 9);
    }

    #[test]
    fn test_warmup_window() {
        let warmup = Warmup::default();
        assert!(warmup.is_active(0.0));
        assert!(warmup.is_active(2999.0));
        assert!(!warmup.is_active(3000.0));
        assert!(!Warmup::NONE.is_active(0.0));
    }

    #[test]
    fn test_warmup_origin_starts_left() {
        let origin = Warmup::origin(0.0);
        assert_eq!(origin, Vec3::new(-1.0, 0.3, 0.0));
    }
}
