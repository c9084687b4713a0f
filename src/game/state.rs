//! Entity definitions for a single play-through
//!
//! Contains the avatar, obstacle pairs, play-field geometry and the
//! per-session statistics that are flushed into lifetime totals.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::constants::{field, obstacle};
use crate::util::vec2::{Rect, Vec2};

/// Unique player identifier
pub type PlayerId = Uuid;

/// Entity identifier for obstacle pairs
pub type EntityId = u64;

/// Play-field geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayField {
    pub width: f32,
    pub height: f32,
    /// Top of the ground strip
    pub ground_height: f32,
}

impl PlayField {
    pub fn new(width: f32, height: f32, ground_height: f32) -> Self {
        Self {
            width,
            height,
            ground_height,
        }
    }

    /// Where a fresh avatar starts
    pub fn avatar_spawn(&self) -> Vec2 {
        Vec2::new(self.width * field::AVATAR_X_RATIO, self.height * 0.5)
    }

    /// Lowest and highest allowed gap centers for a gap of `gap` height
    pub fn gap_center_range(&self, gap: f32) -> (f32, f32) {
        let half = gap * 0.5;
        let low = (self.height * obstacle::GAP_BAND_MIN).max(self.ground_height + half);
        let high = (self.height * obstacle::GAP_BAND_MAX).min(self.height - half);
        if low <= high {
            (low, high)
        } else {
            // Field too small for the band; pin to the middle of the open air
            let mid = (self.ground_height + self.height) * 0.5;
            (mid, mid)
        }
    }
}

impl Default for PlayField {
    fn default() -> Self {
        Self::new(field::WIDTH, field::HEIGHT, field::GROUND_HEIGHT)
    }
}

/// Player-controlled physics body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    pub alive: bool,
    pub radius: f32,
}

impl Avatar {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            alive: true,
            radius: field::AVATAR_RADIUS,
        }
    }

    /// Stop all dynamics after a terminal contact
    pub fn freeze(&mut self) {
        self.alive = false;
        self.velocity = Vec2::ZERO;
    }

    pub fn is_terminated(&self) -> bool {
        !self.alive
    }
}

/// A pair of obstacle halves with a gap and a trailing score zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePair {
    pub id: EntityId,
    /// Left edge of both halves
    pub x: f32,
    /// Vertical center of the gap
    pub gap_center: f32,
    pub gap_height: f32,
    pub width: f32,
    /// Horizontal speed toward the trailing edge (points per second)
    pub speed: f32,
    /// Set once the avatar has passed through the score zone
    pub scored: bool,
    /// Present on special pairs
    pub special: Option<SpecialPair>,
}

/// Variations a spawned pair may carry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpecialPair {
    /// Gap center swings up and down
    Moving(GapOscillation),
    /// Gap opens and closes around its center
    Sizing(GapPulse),
    /// Halves are translucent and never block the avatar
    Ghost,
    /// A coin in the middle of the gap worth one extra point
    Reward { collected: bool },
}

/// Sinusoidal gap motion for moving pairs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapOscillation {
    pub base_center: f32,
    pub amplitude: f32,
    pub period: f32,
    pub elapsed: f32,
}

/// Gap height that eases from `base_height` to `base_height + growth` and back
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapPulse {
    pub base_height: f32,
    pub growth: f32,
    pub period: f32,
    pub elapsed: f32,
}

impl ObstaclePair {
    pub fn new(id: EntityId, x: f32, gap_center: f32, gap_height: f32, speed: f32) -> Self {
        Self {
            id,
            x,
            gap_center,
            gap_height,
            width: obstacle::WIDTH,
            speed,
            scored: false,
            special: None,
        }
    }

    pub fn with_special(mut self, special: SpecialPair) -> Self {
        self.special = Some(special);
        self
    }

    pub fn is_ghost(&self) -> bool {
        matches!(self.special, Some(SpecialPair::Ghost))
    }

    /// Center of the uncollected coin on reward pairs
    pub fn reward_center(&self) -> Option<Vec2> {
        match self.special {
            Some(SpecialPair::Reward { collected: false }) => {
                Some(Vec2::new(self.x + self.width * 0.5, self.gap_center))
            }
            _ => None,
        }
    }

    /// Collect the coin; false if there is none left
    pub fn collect_reward(&mut self) -> bool {
        match self.special.as_mut() {
            Some(SpecialPair::Reward { collected }) if !*collected => {
                *collected = true;
                true
            }
            _ => false,
        }
    }

    /// Opacity the host should draw the halves with
    pub fn opacity(&self) -> f32 {
        if self.is_ghost() {
            obstacle::GHOST_OPACITY
        } else {
            1.0
        }
    }

    /// Lower half: from the floor of the field up to the gap
    pub fn lower_rect(&self) -> Rect {
        let top = self.gap_center - self.gap_height * 0.5;
        Rect::new(self.x, 0.0, self.width, top.max(0.0))
    }

    /// Upper half: from the gap up to `field_height`
    pub fn upper_rect(&self, field_height: f32) -> Rect {
        let bottom = self.gap_center + self.gap_height * 0.5;
        Rect::new(self.x, bottom, self.width, (field_height - bottom).max(0.0))
    }

    /// Full-height strip just behind the pair
    pub fn score_zone(&self, field_height: f32) -> Rect {
        Rect::new(
            self.x + self.width,
            0.0,
            obstacle::SCORE_ZONE_WIDTH,
            field_height,
        )
    }

    /// Right edge has passed the trailing edge of the field
    pub fn is_off_screen(&self) -> bool {
        self.x + self.width < 0.0
    }

    /// Advance horizontally, then animate moving and sizing gaps
    pub fn advance(&mut self, dt: f32) {
        self.x -= self.speed * dt;
        match self.special.as_mut() {
            Some(SpecialPair::Moving(osc)) => {
                osc.elapsed += dt;
                let phase = osc.elapsed / osc.period * TAU;
                self.gap_center = osc.base_center + osc.amplitude * phase.sin();
            }
            Some(SpecialPair::Sizing(pulse)) => {
                pulse.elapsed += dt;
                let phase = pulse.elapsed / pulse.period * TAU;
                self.gap_height = pulse.base_height + pulse.growth * (1.0 - phase.cos()) * 0.5;
            }
            _ => {}
        }
    }
}

/// Per-session counters, flushed into lifetime totals at game over
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Time-integrated distance flown
    pub distance: f64,
    pub flaps: u32,
    /// Seconds spent in `Playing`
    pub elapsed: f32,
}

impl SessionStats {
    pub fn record_flap(&mut self) {
        self.flaps += 1;
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
        self.distance += f64::from(field::DISTANCE_PER_SECOND * dt);
    }
}
