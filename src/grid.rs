//! CPU-resident state grid.

use crate::emission::Run;
use crate::encoding::{GridLayout, ParticleState, Slot, SLOTS_PER_PARTICLE};

/// A row-major grid of slots holding every particle's state.
///
/// Grids are allocated once, zero-filled (every particle inactive) and never resized.
#[derive(Debug, Clone, PartialEq)]
pub struct StateGrid {
    layout: GridLayout,
    slots: Vec<Slot>,
}

impl StateGrid {
    /// Create a zero-filled grid.
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            slots: vec![[0.0; 4]; layout.slot_count()],
        }
    }

    /// Wrap existing slot data (e.g. a GPU readback).
    ///
    /// # Panics
    ///
    /// Panics if `slots.len()` does not match the layout.
    pub fn from_slots(layout: GridLayout, slots: Vec<Slot>) -> Self {
        assert_eq!(slots.len(), layout.slot_count(), "slot count mismatch");
        Self { layout, slots }
    }

    #[inline]
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    #[inline]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    #[inline]
    pub fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }

    /// Raw bytes, as uploaded to an `Rgba32Float` texture.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.slots)
    }

    /// The slot at column `x`, row `y`.
    #[inline]
    pub fn slot(&self, x: u32, y: u32) -> Slot {
        self.slots[y as usize * self.layout.width() as usize + x as usize]
    }

    /// Decoded state of particle `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the layout's capacity.
    pub fn particle(&self, index: u32) -> ParticleState {
        let start = self.layout.linear(self.layout.address(index));
        ParticleState::decode_slice(&self.slots[start..start + SLOTS_PER_PARTICLE as usize])
    }

    /// Iterate over every particle's decoded state in index order.
    pub fn particles(&self) -> impl Iterator<Item = ParticleState> + '_ {
        self.slots
            .chunks_exact(SLOTS_PER_PARTICLE as usize)
            .map(ParticleState::decode_slice)
    }

    /// Number of particles with a positive phase.
    pub fn active_count(&self) -> usize {
        self.particles().filter(ParticleState::is_active).count()
    }

    /// Overwrite one in-row run of slots.
    ///
    /// # Panics
    ///
    /// Panics if the run leaves the grid or `data` does not match its length.
    pub fn write_run(&mut self, run: &Run, data: &[Slot]) {
        assert_eq!(data.len(), run.len as usize, "run data length mismatch");
        assert!(run.end() <= self.layout.width(), "run exceeds grid width");
        assert!(run.y < self.layout.height(), "run row out of bounds");
        let start = run.y as usize * self.layout.width() as usize + run.x as usize;
        self.slots[start..start + data.len()].copy_from_slice(data);
    }

    /// Overwrite every slot with another grid's contents.
    pub fn copy_from(&mut self, other: &StateGrid) {
        self.slots.copy_from_slice(&other.slots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_new_grid_is_inactive() {
        let grid = StateGrid::new(GridLayout::new(16).unwrap());
        assert_eq!(grid.slots().len(), 32);
        assert_eq!(grid.active_count(), 0);
        assert!(grid.particles().all(|p| p == ParticleState::INACTIVE));
    }

    #[test]
    fn test_write_run_lands_at_address() {
        let layout = GridLayout::new(16).unwrap();
        let mut grid = StateGrid::new(layout);
        let state = ParticleState {
            position: Vec3::new(1.0, 2.0, 3.0),
            phase: 4.0,
            velocity: Vec3::new(5.0, 6.0, 7.0),
            reserved: 0.0,
        };
        let encoded = state.encode();
        grid.write_run(&Run { x: 2, y: 1, len: 2 }, &encoded);

        // Particle 5 starts at x = 10 % 8 = 2, y = 5 / 4 = 1
        assert_eq!(grid.particle(5), state);
        assert_eq!(grid.slot(2, 1), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(grid.active_count(), 1);
    }

    #[test]
    #[should_panic(expected = "run exceeds grid width")]
    fn test_write_run_rejects_overflow() {
        let mut grid = StateGrid::new(GridLayout::new(16).unwrap());
        grid.write_run(&Run { x: 6, y: 0, len: 4 }, &[[0.0; 4]; 4]);
    }

    #[test]
    #[should_panic]
    fn test_particle_out_of_range() {
        let grid = StateGrid::new(GridLayout::new(16).unwrap());
        grid.particle(16);
    }

    #[test]
    fn test_bytes_match_slots() {
        let grid = StateGrid::new(GridLayout::new(4).unwrap());
        assert_eq!(grid.as_bytes().len(), 4 * 2 * 16);
    }
}
