//! Input handling.
//!
//! Capture stays with the host: the window feeds raw winit events to [`Input`],
//! which tracks the cursor, active touches and key presses, and reports pointer
//! motion as a [`PointerEvent`]. Everything that turns input into emission
//! requests is a pure mapping here, so it can be tested without a window.
//!
//! # Mappings
//!
//! | Source | Origin | Velocity | Count |
//! |--------|--------|----------|-------|
//! | pointer / touch | `(px/w*2-1, -py/h*2+1, 0)` | zero | budget / touches |
//! | hand tracker fingertip | `(x/200, y/200-1, -z/400)` | `(vx/100, vy/120, vz/180)` | random in `[110, 200)` |

use std::collections::{HashMap, HashSet};

use glam::{UVec2, Vec2, Vec3};
use rand::Rng;
use winit::event::{ElementState, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::emission::EmissionRequest;

/// Map a window position in pixels to normalized device space (`z = 0`).
///
/// Y points up in NDC, so the top edge maps to `+1`.
pub fn pointer_to_ndc(pixel: Vec2, viewport: UVec2) -> Vec3 {
    let size = viewport.max(UVec2::ONE).as_vec2();
    Vec3::new(pixel.x / size.x * 2.0 - 1.0, -pixel.y / size.y * 2.0 + 1.0, 0.0)
}

/// One pointer motion: every pointer position that moved together, in pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointerEvent {
    pub positions: Vec<Vec2>,
}

impl PointerEvent {
    /// A single mouse cursor position.
    pub fn single(position: Vec2) -> Self {
        Self {
            positions: vec![position],
        }
    }

    /// One request per pointer, sharing `budget` particles evenly.
    pub fn requests(&self, viewport: UVec2, budget: u32) -> Vec<EmissionRequest> {
        if self.positions.is_empty() {
            return Vec::new();
        }
        let share = budget / self.positions.len() as u32;
        self.positions
            .iter()
            .map(|&p| EmissionRequest::at(share, pointer_to_ndc(p, viewport)))
            .collect()
    }
}

/// One fingertip reported by a hand tracker, in tracker units (millimetres).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandSample {
    pub tip_position: Vec3,
    pub tip_velocity: Vec3,
}

impl HandSample {
    pub const MIN_COUNT: u32 = 110;
    pub const MAX_COUNT: u32 = 200;

    pub fn origin(&self) -> Vec3 {
        let p = self.tip_position;
        Vec3::new(p.x / 200.0, p.y / 200.0 - 1.0, -p.z / 400.0)
    }

    pub fn velocity(&self) -> Vec3 {
        let v = self.tip_velocity;
        Vec3::new(v.x / 100.0, v.y / 120.0, v.z / 180.0)
    }

    /// The emission for this fingertip, with a random count.
    pub fn request<R: Rng>(&self, rng: &mut R) -> EmissionRequest {
        EmissionRequest::new(
            rng.gen_range(Self::MIN_COUNT..Self::MAX_COUNT),
            self.origin(),
            self.velocity(),
        )
    }
}

/// Drops events that arrive less than `spacing_ms` after the last accepted one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiter {
    spacing_ms: f64,
    last_accepted: Option<f64>,
}

impl RateLimiter {
    pub fn new(spacing_ms: f64) -> Self {
        Self {
            spacing_ms,
            last_accepted: None,
        }
    }

    /// Accept or reject an event at `now_ms`. The first event is always accepted.
    pub fn try_accept(&mut self, now_ms: f64) -> bool {
        if let Some(last) = self.last_accepted {
            if now_ms - last < self.spacing_ms {
                return false;
            }
        }
        self.last_accepted = Some(now_ms);
        true
    }
}

/// Window input state for the host.
#[derive(Debug, Default)]
pub struct Input {
    window_size: UVec2,
    cursor: Option<Vec2>,
    touches: HashMap<u64, Vec2>,
    keys_pressed: HashSet<KeyCode>,
}

impl Input {
    pub fn new(window_size: UVec2) -> Self {
        Self {
            window_size,
            ..Default::default()
        }
    }

    #[inline]
    pub fn window_size(&self) -> UVec2 {
        self.window_size
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = UVec2::new(width, height);
    }

    /// Last known cursor position in pixels.
    #[inline]
    pub fn cursor(&self) -> Option<Vec2> {
        self.cursor
    }

    /// Whether `key` went down since the last [`begin_frame`](Self::begin_frame).
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
    }

    /// Process a winit event, returning pointer motion if there was any.
    ///
    /// A moving touch reports every active touch, so the budget is shared
    /// among all fingers on the screen.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<PointerEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let p = Vec2::new(position.x as f32, position.y as f32);
                self.cursor = Some(p);
                Some(PointerEvent::single(p))
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                None
            }
            WindowEvent::Touch(touch) => {
                let p = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                match touch.phase {
                    TouchPhase::Started => {
                        self.touches.insert(touch.id, p);
                        None
                    }
                    TouchPhase::Moved => {
                        self.touches.insert(touch.id, p);
                        Some(PointerEvent {
                            positions: self.touches.values().copied().collect(),
                        })
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        self.touches.remove(&touch.id);
                        None
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if event.state == ElementState::Pressed && !event.repeat {
                        self.keys_pressed.insert(code);
                    }
                }
                None
            }
            WindowEvent::Resized(size) => {
                self.set_window_size(size.width, size.height);
                None
            }
            _ => None,
        }
    }
}
