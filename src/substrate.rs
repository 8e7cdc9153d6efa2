//! Execution substrates for the state grid.
//!
//! The simulation needs exactly four capabilities from whatever holds its grids:
//! allocate a zero-filled grid, overwrite a rectangular in-row run, apply the
//! physics transform from one grid into another, and copy one grid over another.
//! [`CpuSubstrate`] provides them with a rayon thread pool; the wgpu substrate in
//! [`crate::gpu`] provides them with `Rgba32Float` textures and a compute pass.

use rayon::prelude::*;

use crate::emission::Run;
use crate::encoding::{GridLayout, ParticleState, Slot, SLOTS_PER_PARTICLE};
use crate::grid::StateGrid;
use crate::physics::{integrate, StepParams};

/// A place where state grids live and the physics step runs.
///
/// Implementations may assume the caller never passes the same grid as both
/// input and output; [`DoubleBuffer`](crate::store::DoubleBuffer) enforces this.
pub trait Substrate {
    /// Handle to one state grid.
    type Grid;

    /// Allocate a zero-filled grid (every particle inactive).
    fn create_grid(&mut self, layout: &GridLayout, label: &str) -> Self::Grid;

    /// Overwrite the `run.len x 1` rectangle at `(run.x, run.y)` with `data`.
    fn write_run(&mut self, grid: &mut Self::Grid, run: &Run, data: &[Slot]);

    /// Apply one physics step to every particle of `input`, writing into `output`.
    fn step(&mut self, input: &Self::Grid, output: &mut Self::Grid, params: &StepParams);

    /// Overwrite `dst` with the contents of `src`.
    fn copy(&mut self, src: &Self::Grid, dst: &mut Self::Grid);
}

/// Data-parallel CPU substrate backed by [`StateGrid`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuSubstrate;

impl CpuSubstrate {
    pub fn new() -> Self {
        Self
    }
}

impl Substrate for CpuSubstrate {
    type Grid = StateGrid;

    fn create_grid(&mut self, layout: &GridLayout, _label: &str) -> StateGrid {
        StateGrid::new(*layout)
    }

    fn write_run(&mut self, grid: &mut StateGrid, run: &Run, data: &[Slot]) {
        grid.write_run(run, data);
    }

    fn step(&mut self, input: &StateGrid, output: &mut StateGrid, params: &StepParams) {
        let stride = SLOTS_PER_PARTICLE as usize;
        output
            .slots_mut()
            .par_chunks_exact_mut(stride)
            .zip(input.slots().par_chunks_exact(stride))
            .for_each(|(dst, src)| {
                let next = integrate(ParticleState::decode_slice(src), params);
                dst.copy_from_slice(&next.encode());
            });
    }

    fn copy(&mut self, src: &StateGrid, dst: &mut StateGrid) {
        dst.copy_from(src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_cpu_step_writes_every_particle() {
        let layout = GridLayout::new(64).unwrap();
        let mut substrate = CpuSubstrate::new();
        let mut input = substrate.create_grid(&layout, "input");
        let mut output = substrate.create_grid(&layout, "output");

        // Inactive particles move too
        for slots in input.slots_mut().chunks_exact_mut(2) {
            slots[1] = [1.0, 0.0, 0.0, 0.0];
        }

        substrate.step(&input, &mut output, &StepParams { time_step: 0.5 });
        assert!(output.particles().all(|p| p.position == Vec3::new(0.5, 0.0, 0.0)));
        assert_eq!(output.active_count(), 0);
    }

    #[test]
    fn test_cpu_copy() {
        let layout = GridLayout::new(4).unwrap();
        let mut substrate = CpuSubstrate::new();
        let mut a = substrate.create_grid(&layout, "a");
        let mut b = substrate.create_grid(&layout, "b");
        substrate.write_run(&mut a, &Run { x: 0, y: 1, len: 2 }, &[[1.0; 4], [2.0; 4]]);
        substrate.copy(&a, &mut b);
        assert_eq!(a, b);
    }
}
