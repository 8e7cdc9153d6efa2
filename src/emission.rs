//! Circular emission into the state grid.
//!
//! Emission (re)activates a batch of particles at a shared write cursor that
//! walks the grid in particle order and wraps at capacity. There is no liveness
//! check: whatever occupied the slots under the cursor is overwritten, including
//! particles that are still active. Emitting faster than particles fade simply
//! recycles them early.
//!
//! # Runs
//!
//! A request for `count` particles is one span of `count * 2` slots starting at
//! the cursor's address. Spans that cross the right edge of the grid are split
//! into in-row [`Run`]s, each continuing at column 0 of the next row (wrapping
//! to row 0 after the last row):
//!
//! ```text
//! capacity 16, grid 8x4, cursor 0, emit 5 particles (10 slots)
//!
//!   row 0: [##########......]   run { x: 0, y: 0, len: 8 }
//!   row 1: [####............]   run { x: 0, y: 1, len: 2 }
//! ```
//!
//! Each run becomes one rectangular `len x 1` write.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::encoding::{GridLayout, ParticleState, Slot, SLOTS_PER_PARTICLE};
use crate::substrate::Substrate;

/// A contiguous span of slots within one grid row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// First column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Length in slots.
    pub len: u32,
}

impl Run {
    /// One past the last column.
    #[inline]
    pub fn end(&self) -> u32 {
        self.x + self.len
    }

    /// Number of whole particles in the run.
    #[inline]
    pub fn particles(&self) -> u32 {
        self.len / SLOTS_PER_PARTICLE
    }
}

/// Iterator that splits one emission span into in-row runs.
///
/// Splitting is a loop rather than recursion, so arbitrarily large requests
/// (spanning many rows, or the whole grid several times) need no extra stack.
#[derive(Debug, Clone)]
pub struct RunPlan {
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    remaining: u64,
}

impl RunPlan {
    /// Plan the runs for `count` particles starting at particle `start`.
    pub fn new(layout: &GridLayout, start: u32, count: u32) -> Self {
        let address = layout.address(start);
        Self {
            width: layout.width(),
            height: layout.height(),
            x: address.x,
            y: address.y,
            remaining: count as u64 * SLOTS_PER_PARTICLE as u64,
        }
    }

    /// Total slots still to be planned.
    pub fn remaining_slots(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for RunPlan {
    type Item = Run;

    fn next(&mut self) -> Option<Run> {
        if self.remaining == 0 {
            return None;
        }

        let boundary = self.x as u64 + self.remaining;
        let run = if boundary > self.width as u64 {
            // Shrink to the end of the row, carry the overflow to the next row
            let len = self.width - self.x;
            let run = Run { x: self.x, y: self.y, len };
            self.remaining = boundary - self.width as u64;
            self.x = 0;
            self.y = (self.y + 1) % self.height;
            run
        } else {
            let run = Run {
                x: self.x,
                y: self.y,
                len: self.remaining as u32,
            };
            self.remaining = 0;
            run
        };

        Some(run)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.remaining == 0 {
            return (0, Some(0));
        }
        let first = (self.width - self.x) as u64;
        let runs = if self.remaining <= first {
            1
        } else {
            1 + (self.remaining - first).div_ceil(self.width as u64)
        };
        (runs as usize, Some(runs as usize))
    }
}

impl ExactSizeIterator for RunPlan {}

/// The circular write pointer shared by every emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitCursor {
    index: u32,
    capacity: u32,
}

impl EmitCursor {
    /// A cursor at particle 0 that wraps at the layout's capacity.
    ///
    /// Taking the capacity from a [`GridLayout`] keeps it non-zero.
    pub fn new(layout: &GridLayout) -> Self {
        Self {
            index: 0,
            capacity: layout.capacity(),
        }
    }

    /// Index of the next particle to be written.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Advance by `count` particles, wrapping at capacity.
    #[inline]
    pub fn advance(&mut self, count: u32) {
        self.index = ((self.index as u64 + count as u64) % self.capacity as u64) as u32;
    }
}

/// Constants shaping freshly emitted particles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionParams {
    /// Half-extent of the uniform position jitter around the origin, per axis.
    pub jitter: Vec3,
    /// Upper bound of the initial phase. Phase is drawn from `(0, max_phase)`.
    pub max_phase: f32,
    /// Scale of the random velocity component, drawn from `[-1, 1]` per axis.
    pub force: f32,
}

impl Default for EmissionParams {
    fn default() -> Self {
        Self {
            jitter: Vec3::new(0.02, 0.02, 0.01),
            max_phase: 10.0,
            force: 1.0,
        }
    }
}

/// A single emission: how many particles, where, and with what base velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionRequest {
    pub count: u32,
    /// Origin in normalized device space.
    pub origin: Vec3,
    pub velocity: Vec3,
}

impl EmissionRequest {
    pub fn new(count: u32, origin: Vec3, velocity: Vec3) -> Self {
        Self {
            count,
            origin,
            velocity,
        }
    }

    /// A request with zero base velocity.
    pub fn at(count: u32, origin: Vec3) -> Self {
        Self::new(count, origin, Vec3::ZERO)
    }
}

/// Owns the cursor and RNG, and turns requests into run writes.
#[derive(Debug, Clone)]
pub struct EmissionAllocator {
    layout: GridLayout,
    cursor: EmitCursor,
    params: EmissionParams,
    rng: SmallRng,
    scratch: Vec<Slot>,
}

impl EmissionAllocator {
    /// Create an allocator with the cursor at particle 0.
    pub fn new(layout: GridLayout, params: EmissionParams, seed: u64) -> Self {
        Self {
            layout,
            cursor: EmitCursor::new(&layout),
            params,
            rng: SmallRng::seed_from_u64(seed),
            scratch: Vec::new(),
        }
    }

    #[inline]
    pub fn cursor(&self) -> EmitCursor {
        self.cursor
    }

    #[inline]
    pub fn params(&self) -> &EmissionParams {
        &self.params
    }

    /// The runs the next emission of `count` particles would write.
    pub fn plan(&self, count: u32) -> RunPlan {
        RunPlan::new(&self.layout, self.cursor.index(), count)
    }

    /// Synthesize one freshly emitted particle.
    pub fn spawn(&mut self, origin: Vec3, velocity: Vec3) -> ParticleState {
        let EmissionParams {
            jitter,
            max_phase,
            force,
        } = self.params;

        ParticleState {
            position: origin + random_symmetric(&mut self.rng, jitter),
            phase: self.rng.gen_range(f32::MIN_POSITIVE..max_phase.max(f32::MIN_POSITIVE * 2.0)),
            velocity: velocity + random_symmetric(&mut self.rng, Vec3::ONE) * force,
            reserved: 0.0,
        }
    }

    /// Write `request.count` particles at the cursor into `grid`, then advance the cursor.
    ///
    /// Writes exactly `count * 2` slots as one rectangular update per run.
    /// A count of zero writes nothing and leaves the cursor in place.
    pub fn emit<S: Substrate>(
        &mut self,
        substrate: &mut S,
        grid: &mut S::Grid,
        request: &EmissionRequest,
    ) {
        let EmissionRequest {
            count,
            origin,
            velocity,
        } = *request;

        if count > self.layout.capacity() {
            log::warn!(
                "Emission of {} particles exceeds capacity {}; it overwrites itself",
                count,
                self.layout.capacity()
            );
        }

        let start = self.cursor.index();
        let mut scratch = std::mem::take(&mut self.scratch);
        let mut runs = 0usize;

        for run in self.plan(count) {
            if run.len == 0 {
                continue;
            }
            scratch.clear();
            for _ in 0..run.particles() {
                scratch.extend_from_slice(&self.spawn(origin, velocity).encode());
            }
            substrate.write_run(grid, &run, &scratch);
            runs += 1;
        }

        self.scratch = scratch;
        self.cursor.advance(count);

        log::debug!(
            "Emitted {} particles at {} in {} run(s), cursor now {}",
            count,
            start,
            runs,
            self.cursor.index()
        );
    }
}

fn random_symmetric(rng: &mut SmallRng, extent: Vec3) -> Vec3 {
    Vec3::new(
        symmetric(rng, extent.x),
        symmetric(rng, extent.y),
        symmetric(rng, extent.z),
    )
}

fn symmetric(rng: &mut SmallRng, extent: f32) -> f32 {
    if extent > 0.0 {
        rng.gen_range(-extent..=extent)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::StateGrid;
    use crate::substrate::CpuSubstrate;

    fn layout16() -> GridLayout {
        GridLayout::new(16).unwrap()
    }

    fn check_runs(layout: &GridLayout, runs: &[Run], count: u32) {
        let total: u64 = runs.iter().map(|r| r.len as u64).sum();
        assert_eq!(total, count as u64 * SLOTS_PER_PARTICLE as u64);
        for run in runs {
            assert!(run.len > 0);
            assert!(run.end() <= layout.width());
            assert!(run.y < layout.height());
            assert_eq!(run.len % SLOTS_PER_PARTICLE, 0);
        }
        // Each continuation starts at column 0 of the following row
        for pair in runs.windows(2) {
            assert_eq!(pair[0].end(), layout.width());
            assert_eq!(pair[1].x, 0);
            assert_eq!(pair[1].y, (pair[0].y + 1) % layout.height());
        }
    }

    #[test]
    fn test_plan_splits_at_row_edge() {
        let layout = layout16();
        let runs: Vec<Run> = RunPlan::new(&layout, 0, 5).collect();
        assert_eq!(
            runs,
            vec![Run { x: 0, y: 0, len: 8 }, Run { x: 0, y: 1, len: 2 }]
        );
        check_runs(&layout, &runs, 5);
    }

    #[test]
    fn test_plan_fits_in_row() {
        let layout = layout16();
        let runs: Vec<Run> = RunPlan::new(&layout, 1, 3).collect();
        assert_eq!(runs, vec![Run { x: 2, y: 0, len: 6 }]);
    }

    #[test]
    fn test_plan_exactly_fills_row() {
        let layout = layout16();
        let runs: Vec<Run> = RunPlan::new(&layout, 4, 4).collect();
        assert_eq!(runs, vec![Run { x: 0, y: 1, len: 8 }]);
    }

    #[test]
    fn test_plan_wraps_last_row() {
        let layout = layout16();
        let runs: Vec<Run> = RunPlan::new(&layout, 14, 4).collect();
        assert_eq!(
            runs,
            vec![Run { x: 4, y: 3, len: 4 }, Run { x: 0, y: 0, len: 4 }]
        );
        check_runs(&layout, &runs, 4);
    }

    #[test]
    fn test_plan_zero_count_is_empty() {
        let layout = layout16();
        let plan = RunPlan::new(&layout, 7, 0);
        assert_eq!(plan.len(), 0);
        assert_eq!(plan.count(), 0);
    }

    #[test]
    fn test_plan_handles_deep_splits() {
        let layout = layout16();
        // 40 particles = 80 slots = 10 full rows, wrapping the grid twice
        let plan = RunPlan::new(&layout, 2, 40);
        assert_eq!(plan.len(), 11);
        let runs: Vec<Run> = plan.collect();
        assert_eq!(runs.len(), 11);
        assert_eq!(runs[0], Run { x: 4, y: 0, len: 4 });
        assert_eq!(runs[10], Run { x: 0, y: 2, len: 4 });
        check_runs(&layout, &runs, 40);
    }

    #[test]
    fn test_size_hint_matches_count() {
        let layout = GridLayout::new(64).unwrap();
        for start in 0..64 {
            for count in [0, 1, 7, 8, 9, 63, 64, 65, 200] {
                let plan = RunPlan::new(&layout, start, count);
                let expected = plan.len();
                let runs: Vec<Run> = plan.collect();
                assert_eq!(runs.len(), expected, "start {} count {}", start, count);
                check_runs(&layout, &runs, count);
            }
        }
    }

    #[test]
    fn test_cursor_wraps() {
        let mut cursor = EmitCursor::new(&layout16());
        cursor.advance(5);
        assert_eq!(cursor.index(), 5);
        cursor.advance(16);
        assert_eq!(cursor.index(), 5);
        cursor.advance(11);
        assert_eq!(cursor.index(), 0);
        cursor.advance(u32::MAX);
        assert_eq!(cursor.index(), (u32::MAX as u64 % 16) as u32);
    }

    #[test]
    fn test_cursor_wraps_at_layout_capacity() {
        let layout = GridLayout::new(1024 * 1024).unwrap();
        let mut cursor = EmitCursor::new(&layout);
        cursor.advance(layout.capacity() - 3);
        cursor.advance(5);
        assert_eq!(cursor.index(), 2);

        // A run from the last row carries over to row 0
        let runs: Vec<Run> = RunPlan::new(&layout, layout.capacity() - 3, 5).collect();
        assert_eq!(
            runs,
            vec![
                Run {
                    x: layout.width() - 6,
                    y: layout.height() - 1,
                    len: 6,
                },
                Run { x: 0, y: 0, len: 4 },
            ]
        );
    }

    #[test]
    fn test_emit_example() {
        let layout = layout16();
        let mut substrate = CpuSubstrate::new();
        let mut grid = StateGrid::new(layout);
        let mut allocator = EmissionAllocator::new(layout, EmissionParams::default(), 7);

        allocator.emit(&mut substrate, &mut grid, &EmissionRequest::at(5, Vec3::ZERO));

        assert_eq!(allocator.cursor().index(), 5);
        assert_eq!(grid.active_count(), 5);
        for i in 0..5 {
            assert!(grid.particle(i).is_active());
        }
        for i in 5..16 {
            assert!(!grid.particle(i).is_active());
        }
        // Second row holds exactly one emitted particle
        assert!(grid.slot(0, 1)[3] > 0.0);
        assert_eq!(grid.slot(2, 1), [0.0; 4]);
    }

    #[test]
    fn test_emitted_state_ranges() {
        let layout = GridLayout::new(256).unwrap();
        let mut substrate = CpuSubstrate::new();
        let mut grid = StateGrid::new(layout);
        let params = EmissionParams::default();
        let mut allocator = EmissionAllocator::new(layout, params, 42);

        let origin = Vec3::new(0.5, -0.25, 0.0);
        let velocity = Vec3::new(2.0, 0.0, -1.0);
        allocator.emit(
            &mut substrate,
            &mut grid,
            &EmissionRequest::new(100, origin, velocity),
        );

        for i in 0..100 {
            let p = grid.particle(i);
            let offset = (p.position - origin).abs();
            assert!(offset.cmple(params.jitter + 1e-6).all(), "jitter {:?}", offset);
            assert!(p.phase > 0.0 && p.phase < params.max_phase);
            let spread = (p.velocity - velocity).abs();
            assert!(spread.cmple(Vec3::splat(params.force + 1e-6)).all());
            assert_eq!(p.reserved, 0.0);
        }
    }

    #[test]
    fn test_emit_overwrites_without_liveness_check() {
        let layout = layout16();
        let mut substrate = CpuSubstrate::new();
        let mut grid = StateGrid::new(layout);
        let mut allocator = EmissionAllocator::new(layout, EmissionParams::default(), 1);

        allocator.emit(&mut substrate, &mut grid, &EmissionRequest::at(16, Vec3::ZERO));
        assert_eq!(allocator.cursor().index(), 0);
        assert_eq!(grid.active_count(), 16);

        let far = Vec3::new(100.0, 100.0, 0.0);
        allocator.emit(&mut substrate, &mut grid, &EmissionRequest::at(2, far));
        assert!(grid.particle(0).position.x > 99.0);
        assert!(grid.particle(1).position.x > 99.0);
        assert!(grid.particle(2).position.x < 1.0);
    }

    #[test]
    fn test_emit_same_seed_is_deterministic() {
        let layout = layout16();
        let mut substrate = CpuSubstrate::new();
        let mut a = StateGrid::new(layout);
        let mut b = StateGrid::new(layout);
        let request = EmissionRequest::at(9, Vec3::ONE);

        EmissionAllocator::new(layout, EmissionParams::default(), 99)
            .emit(&mut substrate, &mut a, &request);
        EmissionAllocator::new(layout, EmissionParams::default(), 99)
            .emit(&mut substrate, &mut b, &request);
        assert_eq!(a, b);
    }
}
