//! Double-buffered state grids.
//!
//! A shader pass cannot read and write the same texture. The store therefore
//! holds two grids in fixed roles for the duration of a step:
//!
//! - **input**: read by the physics step, written by emission, sampled by the renderer
//! - **output**: written by the physics step
//!
//! After each step, [`DoubleBuffer::publish`] makes the step's result the new input,
//! either by copying output back over input ([`PublishMode::CopyBack`]) or by
//! exchanging the roles ([`PublishMode::Swap`]). Both leave identical contents in
//! the input role, so particle trajectories do not depend on the mode.

use crate::encoding::GridLayout;
use crate::physics::StepParams;
use crate::substrate::Substrate;

/// How a finished step is published to the input role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// Copy the output grid over the input grid. Costs one full-grid copy per
    /// frame, but emission always targets the same grid.
    #[default]
    CopyBack,
    /// Exchange the roles of the two grids (ping-pong).
    Swap,
}

/// Which of the two grids plays a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Input,
    Output,
}

/// A tagged pair of equally-sized grids.
///
/// Callers only ever see the grids through their roles, so the physics step
/// can never alias its source and destination.
pub struct DoubleBuffer<G> {
    grids: [G; 2],
    /// Index of the grid currently playing [`Role::Input`].
    input: usize,
    mode: PublishMode,
    steps: u64,
}

impl<G> DoubleBuffer<G> {
    /// Allocate both grids through `substrate`.
    pub fn new<S>(substrate: &mut S, layout: &GridLayout, mode: PublishMode) -> Self
    where
        S: Substrate<Grid = G>,
    {
        let a = substrate.create_grid(layout, "State Grid A");
        let b = substrate.create_grid(layout, "State Grid B");
        Self::from_grids(a, b, mode)
    }

    /// Wrap two existing grids; `input` starts as the input role.
    pub fn from_grids(input: G, output: G, mode: PublishMode) -> Self {
        Self {
            grids: [input, output],
            input: 0,
            mode,
            steps: 0,
        }
    }

    #[inline]
    pub fn mode(&self) -> PublishMode {
        self.mode
    }

    /// Number of steps published so far.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The most recently published grid (the zero grid before the first step).
    ///
    /// This is the input role: what emission writes into and what the renderer samples.
    #[inline]
    pub fn current(&self) -> &G {
        &self.grids[self.input]
    }

    /// Mutable access to the input role, for emission.
    #[inline]
    pub fn current_mut(&mut self) -> &mut G {
        &mut self.grids[self.input]
    }

    /// The grid the next step writes into.
    #[inline]
    pub fn scratch(&self) -> &G {
        &self.grids[1 - self.input]
    }

    /// The grid playing `role`.
    #[inline]
    pub fn get(&self, role: Role) -> &G {
        match role {
            Role::Input => self.current(),
            Role::Output => self.scratch(),
        }
    }

    /// Index (0 = A, 1 = B) of the grid playing `role`.
    #[inline]
    pub fn index_of(&self, role: Role) -> usize {
        match role {
            Role::Input => self.input,
            Role::Output => 1 - self.input,
        }
    }

    /// Borrow input immutably and output mutably at the same time.
    pub fn split_mut(&mut self) -> (&G, &mut G) {
        let (first, second) = self.grids.split_at_mut(1);
        if self.input == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    /// Borrow input mutably and output immutably, for copy-back publishing.
    fn split_input_mut(&mut self) -> (&mut G, &G) {
        let (first, second) = self.grids.split_at_mut(1);
        if self.input == 0 {
            (&mut first[0], &second[0])
        } else {
            (&mut second[0], &first[0])
        }
    }

    /// Run one physics step from input into output. Does not publish.
    pub fn step<S>(&mut self, substrate: &mut S, params: &StepParams)
    where
        S: Substrate<Grid = G>,
    {
        let (input, output) = self.split_mut();
        substrate.step(input, output, params);
    }

    /// Make the last step's output the new input.
    pub fn publish<S>(&mut self, substrate: &mut S)
    where
        S: Substrate<Grid = G>,
    {
        match self.mode {
            PublishMode::CopyBack => {
                let (input, output) = self.split_input_mut();
                substrate.copy(output, input);
            }
            PublishMode::Swap => {
                self.input = 1 - self.input;
            }
        }
        self.steps += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emission::Run;
    use crate::substrate::CpuSubstrate;

    fn velocity_run() -> (Run, [[f32; 4]; 2]) {
        (
            Run { x: 0, y: 0, len: 2 },
            [[0.0, 0.0, 0.0, 1.0], [1.0, 0.0, 0.0, 0.0]],
        )
    }

    #[test]
    fn test_initial_grids_are_zero() {
        let layout = GridLayout::new(16).unwrap();
        let mut substrate = CpuSubstrate::new();
        let store = DoubleBuffer::new(&mut substrate, &layout, PublishMode::CopyBack);
        assert_eq!(store.current().active_count(), 0);
        assert_eq!(store.scratch().active_count(), 0);
        assert_eq!(store.steps(), 0);
    }

    #[test]
    fn test_copy_back_keeps_input_role_fixed() {
        let layout = GridLayout::new(16).unwrap();
        let mut substrate = CpuSubstrate::new();
        let mut store = DoubleBuffer::new(&mut substrate, &layout, PublishMode::CopyBack);
        let (run, data) = velocity_run();
        substrate.write_run(store.current_mut(), &run, &data);

        store.step(&mut substrate, &StepParams { time_step: 1.0 });
        // Input untouched until publish
        assert_eq!(store.current().particle(0).position.x, 0.0);
        assert_eq!(store.scratch().particle(0).position.x, 1.0);

        store.publish(&mut substrate);
        assert_eq!(store.index_of(Role::Input), 0);
        assert_eq!(store.current().particle(0).position.x, 1.0);
        assert_eq!(store.current(), store.scratch());
        assert_eq!(store.steps(), 1);
    }

    #[test]
    fn test_copy_back_repeats_without_drifting_roles() {
        let layout = GridLayout::new(16).unwrap();
        let mut substrate = CpuSubstrate::new();
        let mut store = DoubleBuffer::new(&mut substrate, &layout, PublishMode::CopyBack);
        let (run, data) = velocity_run();
        substrate.write_run(store.current_mut(), &run, &data);

        for step in 1..=3 {
            store.step(&mut substrate, &StepParams { time_step: 1.0 });
            store.publish(&mut substrate);
            assert_eq!(store.index_of(Role::Input), 0);
            assert_eq!(store.current().particle(0).position.x, step as f32);
            assert_eq!(store.current(), store.scratch());
        }
    }

    #[test]
    fn test_swap_exchanges_roles() {
        let layout = GridLayout::new(16).unwrap();
        let mut substrate = CpuSubstrate::new();
        let mut store = DoubleBuffer::new(&mut substrate, &layout, PublishMode::Swap);
        let (run, data) = velocity_run();
        substrate.write_run(store.current_mut(), &run, &data);

        store.step(&mut substrate, &StepParams { time_step: 1.0 });
        store.publish(&mut substrate);
        assert_eq!(store.index_of(Role::Input), 1);
        assert_eq!(store.index_of(Role::Output), 0);
        assert_eq!(store.current().particle(0).position.x, 1.0);

        store.step(&mut substrate, &StepParams { time_step: 1.0 });
        store.publish(&mut substrate);
        assert_eq!(store.index_of(Role::Input), 0);
        assert_eq!(store.get(Role::Input).particle(0).position.x, 2.0);
    }

    #[test]
    fn test_modes_agree() {
        let layout = GridLayout::new(16).unwrap();
        let mut substrate = CpuSubstrate::new();
        let mut copy_back = DoubleBuffer::new(&mut substrate, &layout, PublishMode::CopyBack);
        let mut swap = DoubleBuffer::new(&mut substrate, &layout, PublishMode::Swap);
        let (run, data) = velocity_run();
        let params = StepParams { time_step: 0.1 };

        for frame in 0..5 {
            if frame % 2 == 0 {
                substrate.write_run(copy_back.current_mut(), &run, &data);
                substrate.write_run(swap.current_mut(), &run, &data);
            }
            copy_back.step(&mut substrate, &params);
            copy_back.publish(&mut substrate);
            swap.step(&mut substrate, &params);
            swap.publish(&mut substrate);
            assert_eq!(copy_back.current(), swap.current());
        }
    }
}
