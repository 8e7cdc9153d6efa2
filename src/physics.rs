//! The per-particle physics step.
//!
//! Each step advances every particle by one fixed timestep. The step is not
//! scaled by wall-clock frame time, so trajectories depend only on the number
//! of steps taken. It runs over the entire grid, active or not: inactive
//! particles drift too, and hiding them is the renderer's job.

use crate::encoding::ParticleState;

/// Parameters of the physics step, uploaded to the GPU as a uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    /// Fixed per-step timestep.
    pub time_step: f32,
}

impl Default for StepParams {
    fn default() -> Self {
        Self { time_step: 0.01 }
    }
}

/// Advance one particle by one step.
///
/// `position += velocity * time_step`. Phase, velocity and the reserved channel
/// pass through unchanged. Mirrors `physics.wgsl`.
#[inline]
pub fn integrate(state: ParticleState, params: &StepParams) -> ParticleState {
    ParticleState {
        position: state.position + state.velocity * params.time_step,
        ..state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_integrate_is_linear() {
        let params = StepParams { time_step: 0.25 };
        let mut p = ParticleState {
            velocity: Vec3::new(1.0, 0.0, 0.0),
            phase: 3.0,
            ..ParticleState::INACTIVE
        };

        p = integrate(p, &params);
        assert_eq!(p.position, Vec3::new(0.25, 0.0, 0.0));
        p = integrate(p, &params);
        assert_eq!(p.position, Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(p.velocity, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(p.phase, 3.0);
    }

    #[test]
    fn test_zero_velocity_is_fixed_point() {
        let params = StepParams::default();
        let start = ParticleState {
            position: Vec3::new(0.3, -0.7, 0.05),
            phase: 1.0,
            ..ParticleState::INACTIVE
        };
        let mut p = start;
        for _ in 0..100 {
            p = integrate(p, &params);
        }
        assert_eq!(p, start);
    }
}
