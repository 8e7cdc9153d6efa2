//! # texel-particles
//!
//! Particle simulation whose entire state lives in a pair of float textures.
//!
//! Every particle owns two adjacent `Rgba32Float` texels of a `2·√N × √N`
//! grid: position and phase in the first, velocity in the second. Each frame a
//! data-parallel physics step reads one grid and writes the other, and the
//! result is published back for the next frame. New particles are written in
//! place at a circular cursor, overwriting whatever was there.
//!
//! ## Quick Start
//!
//! ```ignore
//! use texel_particles::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     // Interactive: window, GPU substrate, mouse/touch emission
//!     texel_particles::run(SimulationConfig::new().with_capacity(512 * 512))
//! }
//! ```
//!
//! Headless, on the CPU:
//!
//! ```ignore
//! let config = SimulationConfig::new().with_capacity(256 * 256).with_seed(7);
//! let mut system = ParticleSystem::cpu(&config)?;
//!
//! system.emit(1000, Vec3::ZERO, Vec3::new(0.0, 0.5, 0.0));
//! system.advance();
//!
//! let grid = system.current_state_grid();
//! println!("{} active", grid.active_count());
//! ```
//!
//! ## Layout
//!
//! | Particle `i` | Texel |
//! |--------------|-------|
//! | position, phase | `((2i) mod width, i / height)` |
//! | velocity, reserved | one texel to the right |
//!
//! A particle is active while its phase is positive. Zeroed grids hold only
//! inactive particles.
//!
//! ## Frame order
//!
//! [`FrameDriver::frame`] runs the warm-up trickle, drains queued emissions,
//! steps, and publishes. See [`PublishMode`] for the two ways of publishing.
//!
//! ## Substrates
//!
//! | Substrate | Grid | Step |
//! |-----------|------|------|
//! | [`CpuSubstrate`] | [`StateGrid`] (host memory) | rayon |
//! | [`GpuSubstrate`] | [`GpuGrid`] (wgpu texture) | compute shader |

pub mod config;
pub mod debug;
pub mod driver;
pub mod emission;
pub mod encoding;
pub mod error;
pub mod gpu;
pub mod grid;
pub mod input;
pub mod physics;
pub mod store;
pub mod substrate;
pub mod system;
pub mod time;
mod window;

pub use config::{SimulationConfig, Warmup, DEFAULT_CAPACITY};
pub use driver::{FrameDriver, FrameReport};
pub use emission::{EmissionAllocator, EmissionParams, EmissionRequest, EmitCursor, Run, RunPlan};
pub use encoding::{GridLayout, ParticleState, Slot, SlotAddress};
pub use error::{DebugError, GpuError, LayoutError, SimulationError};
pub use glam::{UVec2, Vec2, Vec3};
pub use gpu::{GpuContext, GpuGrid, GpuSubstrate, PointRenderer};
pub use grid::StateGrid;
pub use input::{HandSample, Input, PointerEvent, RateLimiter};
pub use physics::StepParams;
pub use store::{DoubleBuffer, PublishMode, Role};
pub use substrate::{CpuSubstrate, Substrate};
pub use system::ParticleSystem;
pub use time::Time;
pub use window::run;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use texel_particles::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{SimulationConfig, Warmup};
    pub use crate::driver::FrameDriver;
    pub use crate::emission::{EmissionParams, EmissionRequest};
    pub use crate::encoding::{GridLayout, ParticleState};
    pub use crate::error::SimulationError;
    pub use crate::grid::StateGrid;
    pub use crate::input::{HandSample, PointerEvent};
    pub use crate::store::PublishMode;
    pub use crate::substrate::{CpuSubstrate, Substrate};
    pub use crate::system::ParticleSystem;
    pub use crate::{UVec2, Vec2, Vec3};
}
