//! The simulation context.
//!
//! [`ParticleSystem`] bundles everything one simulation owns: the grid layout,
//! the execution substrate, the double-buffered grids, and the emission
//! allocator with its cursor. Operations take `&mut self`, so emission, the
//! physics step and publishing can never overlap.

use glam::Vec3;

use crate::config::SimulationConfig;
use crate::emission::{EmissionAllocator, EmissionRequest, EmitCursor, RunPlan};
use crate::encoding::GridLayout;
use crate::error::LayoutError;
use crate::physics::StepParams;
use crate::store::{DoubleBuffer, PublishMode};
use crate::substrate::{CpuSubstrate, Substrate};

/// A fixed-capacity particle simulation on substrate `S`.
pub struct ParticleSystem<S: Substrate> {
    layout: GridLayout,
    substrate: S,
    store: DoubleBuffer<S::Grid>,
    allocator: EmissionAllocator,
    step_params: StepParams,
}

impl ParticleSystem<CpuSubstrate> {
    /// A simulation on the CPU substrate.
    pub fn cpu(config: &SimulationConfig) -> Result<Self, LayoutError> {
        Self::new(CpuSubstrate::new(), config)
    }
}

impl<S: Substrate> ParticleSystem<S> {
    /// Allocate both grids on `substrate` and place the cursor at particle 0.
    pub fn new(mut substrate: S, config: &SimulationConfig) -> Result<Self, LayoutError> {
        let layout = GridLayout::new(config.capacity)?;
        let store = DoubleBuffer::new(&mut substrate, &layout, config.publish_mode);
        let allocator = EmissionAllocator::new(layout, config.emission, config.resolve_seed());

        log::info!(
            "Particle system: {} particles, {}x{} state grid, {:?} publish",
            layout.capacity(),
            layout.width(),
            layout.height(),
            config.publish_mode
        );

        Ok(Self {
            layout,
            substrate,
            store,
            allocator,
            step_params: config.step,
        })
    }

    #[inline]
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    #[inline]
    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    #[inline]
    pub fn substrate_mut(&mut self) -> &mut S {
        &mut self.substrate
    }

    #[inline]
    pub fn cursor(&self) -> EmitCursor {
        self.allocator.cursor()
    }

    #[inline]
    pub fn step_params(&self) -> &StepParams {
        &self.step_params
    }

    #[inline]
    pub fn publish_mode(&self) -> PublishMode {
        self.store.mode()
    }

    /// Number of physics steps published so far.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.store.steps()
    }

    /// Read-only handle to the most recently published state grid.
    #[inline]
    pub fn current_state_grid(&self) -> &S::Grid {
        self.store.current()
    }

    /// The double buffer itself, for hosts that bind both grids.
    #[inline]
    pub fn store(&self) -> &DoubleBuffer<S::Grid> {
        &self.store
    }

    /// The runs the next emission of `count` particles would write.
    pub fn plan(&self, count: u32) -> RunPlan {
        self.allocator.plan(count)
    }

    /// Activate `count` particles at `origin` with base `velocity`.
    ///
    /// Fire-and-forget: overwrites whatever sits under the cursor.
    pub fn emit(&mut self, count: u32, origin: Vec3, velocity: Vec3) {
        self.emit_request(&EmissionRequest::new(count, origin, velocity));
    }

    pub fn emit_request(&mut self, request: &EmissionRequest) {
        self.allocator
            .emit(&mut self.substrate, self.store.current_mut(), request);
    }

    /// Run the physics step from input into output.
    pub fn step(&mut self) {
        self.store.step(&mut self.substrate, &self.step_params);
    }

    /// Publish the last step's output as the new current grid.
    pub fn publish(&mut self) {
        self.store.publish(&mut self.substrate);
    }

    /// Step then publish.
    pub fn advance(&mut self) {
        self.step();
        self.publish();
    }
}
