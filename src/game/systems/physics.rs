use serde::{Deserialize, Serialize};

use crate::game::constants::{physics, rotation};
use crate::game::state::Avatar;

/// Vertical dynamics parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsParams {
    /// Signed vertical acceleration (negative = down)
    pub gravity: f32,
    /// Upward velocity after a flap
    pub flap_impulse: f32,
    /// Terminal fall speed (positive magnitude)
    pub max_fall_speed: f32,
    pub rotation: RotationTuning,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            gravity: physics::GRAVITY,
            flap_impulse: physics::FLAP_IMPULSE,
            max_fall_speed: physics::MAX_FALL_SPEED,
            rotation: RotationTuning::default(),
        }
    }
}

/// Rotation-from-velocity preset
///
/// `Baseline` is the canonical tuning: descending tilts the nose down
/// (negative, counter-clockwise positive) three times faster than ascending
/// tilts it up, clamped to `[-1.0, 0.5]`.
///
/// `Refined` uses a single influence with the opposite sign convention
/// (positive = nose down), clamped to `[-PI/10, PI/4]`. The presets are not
/// interchangeable and are never blended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationTuning {
    #[default]
    Baseline,
    Refined,
}

impl RotationTuning {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "baseline" => Some(Self::Baseline),
            "refined" => Some(Self::Refined),
            _ => None,
        }
    }
}

/// Rotation for a given vertical velocity
pub fn rotation_for_velocity(vy: f32, tuning: RotationTuning) -> f32 {
    match tuning {
        RotationTuning::Baseline => {
            let scale = if vy < 0.0 {
                rotation::BASELINE_DESCEND_SCALE
            } else {
                rotation::BASELINE_ASCEND_SCALE
            };
            (vy * scale).clamp(rotation::BASELINE_MIN, rotation::BASELINE_MAX)
        }
        RotationTuning::Refined => (vy * -rotation::REFINED_VELOCITY_INFLUENCE)
            .clamp(rotation::REFINED_MIN, rotation::REFINED_MAX),
    }
}

/// Discard vertical velocity and apply the flap impulse
///
/// Returns false (and does nothing) for a terminated avatar.
pub fn flap(avatar: &mut Avatar, params: &PhysicsParams) -> bool {
    if !avatar.alive {
        return false;
    }
    avatar.velocity.y = 0.0;
    avatar.velocity.y += params.flap_impulse;
    true
}

/// Integrate one tick: gravity, terminal speed, position, rotation
pub fn integrate(avatar: &mut Avatar, params: &PhysicsParams, dt: f32) {
    if !avatar.alive {
        return;
    }

    avatar.velocity.y += params.gravity * dt;
    avatar.velocity.y = avatar.velocity.y.max(-params.max_fall_speed);

    avatar.position += avatar.velocity * dt;
    avatar.rotation = rotation_for_velocity(avatar.velocity.y, params.rotation);
}

/// Nose-dive spin applied on crash, proportional to crash height
pub fn crash_spin(avatar: &Avatar) -> f32 {
    std::f32::consts::PI * avatar.position.y * 0.01
}
