//! Particle state encoding.
//!
//! Simulation state lives in a 2D grid of four-channel slots (one slot is one
//! `Rgba32Float` texel). Each particle owns [`SLOTS_PER_PARTICLE`] consecutive
//! slots in a row:
//!
//! | Slot | r | g | b | a |
//! |------|---|---|---|---|
//! | 0 | position.x | position.y | position.z | phase |
//! | 1 | velocity.x | velocity.y | velocity.z | reserved |
//!
//! A phase above zero marks the particle as active. There is no separate alive flag.
//!
//! # Addressing
//!
//! For a capacity `N` (a perfect square), the grid is `sqrt(N) * 2` slots wide and
//! `sqrt(N)` slots tall. Particle `i` starts at
//!
//! ```text
//! x = (i * 2) mod width
//! y = floor(i / height)
//! ```
//!
//! Any renderer that fetches particle state must derive the same coordinate.
//! The formula is only a bijection because `height == width / 2`, which
//! [`GridLayout::new`] guarantees.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::error::LayoutError;

/// Number of slots each particle occupies.
pub const SLOTS_PER_PARTICLE: u32 = 2;

/// Number of channels in a slot.
pub const CHANNELS: usize = 4;

/// One addressable grid cell: four `f32` channels.
pub type Slot = [f32; CHANNELS];

/// The encoded form of a single particle: its slots, in order.
pub type EncodedParticle = [Slot; SLOTS_PER_PARTICLE as usize];

/// Decoded simulation state of one particle.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ParticleState {
    pub position: Vec3,
    /// Age/activity signal. Values above zero mean the particle is active.
    pub phase: f32,
    pub velocity: Vec3,
    /// Unused channel, carried through unchanged.
    pub reserved: f32,
}

impl ParticleState {
    /// An inactive particle at rest at the origin (the zero-filled grid).
    pub const INACTIVE: Self = Self {
        position: Vec3::ZERO,
        phase: 0.0,
        velocity: Vec3::ZERO,
        reserved: 0.0,
    };

    #[inline]
    pub fn is_active(&self) -> bool {
        self.phase > 0.0
    }

    /// Encode into the particle's slots.
    #[inline]
    pub fn encode(&self) -> EncodedParticle {
        [
            [self.position.x, self.position.y, self.position.z, self.phase],
            [self.velocity.x, self.velocity.y, self.velocity.z, self.reserved],
        ]
    }

    /// Decode from the particle's slots.
    #[inline]
    pub fn decode(slots: &EncodedParticle) -> Self {
        let [head, tail] = slots;
        Self {
            position: Vec3::new(head[0], head[1], head[2]),
            phase: head[3],
            velocity: Vec3::new(tail[0], tail[1], tail[2]),
            reserved: tail[3],
        }
    }

    /// Decode from a slice of exactly [`SLOTS_PER_PARTICLE`] slots.
    ///
    /// # Panics
    ///
    /// Panics if `slots` is not exactly two slots long.
    #[inline]
    pub fn decode_slice(slots: &[Slot]) -> Self {
        Self::decode(&[slots[0], slots[1]])
    }
}

/// Column/row of a slot in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotAddress {
    pub x: u32,
    pub y: u32,
}

/// Fixed dimensions of a state grid for a given particle capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    capacity: u32,
    side: u32,
}

impl GridLayout {
    /// Derive the grid layout for `capacity` particles.
    ///
    /// The capacity must be a non-zero perfect square.
    pub fn new(capacity: u32) -> Result<Self, LayoutError> {
        if capacity == 0 {
            return Err(LayoutError::ZeroCapacity);
        }
        let side = integer_sqrt(capacity);
        if side * side != capacity {
            return Err(LayoutError::NotSquare(capacity));
        }
        Ok(Self { capacity, side })
    }

    /// Total number of particles (`N`).
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// `sqrt(N)`: particles per row.
    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Grid width in slots.
    #[inline]
    pub fn width(&self) -> u32 {
        self.side * SLOTS_PER_PARTICLE
    }

    /// Grid height in slots.
    #[inline]
    pub fn height(&self) -> u32 {
        self.side
    }

    /// Total number of slots in the grid.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Address of particle `index`'s first slot.
    ///
    /// `index` must be below [`capacity`](Self::capacity); this is not checked.
    #[inline]
    pub fn address(&self, index: u32) -> SlotAddress {
        let index = index as u64;
        SlotAddress {
            x: ((index * SLOTS_PER_PARTICLE as u64) % self.width() as u64) as u32,
            y: (index / self.height() as u64) as u32,
        }
    }

    /// Linear (row-major) slot offset of an address.
    #[inline]
    pub fn linear(&self, address: SlotAddress) -> usize {
        address.y as usize * self.width() as usize + address.x as usize
    }

    /// Normalized read coordinate of particle `index`, as a point renderer samples it.
    #[inline]
    pub fn data_location(&self, index: u32) -> Vec2 {
        let step = 1.0 / self.side as f32;
        Vec2::new(
            step * (index % self.side) as f32,
            step * (index / self.side) as f32,
        )
    }

    /// Read coordinates for every particle, in index order.
    pub fn data_locations(&self) -> Vec<Vec2> {
        (0..self.capacity).map(|i| self.data_location(i)).collect()
    }
}

fn integer_sqrt(n: u32) -> u32 {
    let mut root = (n as f64).sqrt() as u32;
    while root as u64 * root as u64 > n as u64 {
        root -= 1;
    }
    while (root as u64 + 1) * (root as u64 + 1) <= n as u64 {
        root += 1;
    }
    root
}
