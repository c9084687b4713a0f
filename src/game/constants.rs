/// Physics constants. Velocities are in points per second, y grows upward.
pub mod physics {
    /// Downward acceleration applied every tick
    pub const GRAVITY: f32 = -750.0;
    /// Upward velocity set by a flap (unit mass: impulse == delta-v)
    pub const FLAP_IMPULSE: f32 = 380.0;
    /// Fastest the avatar may fall; there is no upward cap so a flap is exact
    pub const MAX_FALL_SPEED: f32 = 600.0;
    /// Simulation tick rate in Hz (one tick per rendered frame)
    pub const TICK_RATE: u32 = 60;
    /// Delta time per tick in seconds
    pub const DT: f32 = 1.0 / 60.0;
    /// Tick duration in milliseconds
    pub const TICK_DURATION_MS: u64 = 1000 / TICK_RATE as u64;
}

/// Rotation-from-velocity tuning
///
/// Two presets exist and are never blended; see
/// [`crate::game::systems::physics::RotationTuning`].
pub mod rotation {
    /// Baseline: scale applied while descending (vy < 0)
    pub const BASELINE_DESCEND_SCALE: f32 = 0.003;
    /// Baseline: scale applied while ascending
    pub const BASELINE_ASCEND_SCALE: f32 = 0.001;
    /// Baseline clamp (radians, counter-clockwise positive)
    pub const BASELINE_MIN: f32 = -1.0;
    pub const BASELINE_MAX: f32 = 0.5;

    /// Refined: single velocity influence, sign flipped (positive = nose down)
    pub const REFINED_VELOCITY_INFLUENCE: f32 = 0.003;
    /// Refined clamp: 18 degrees up to 45 degrees down
    pub const REFINED_MIN: f32 = -std::f32::consts::PI / 10.0;
    pub const REFINED_MAX: f32 = std::f32::consts::PI / 4.0;
}

/// Play-field layout
pub mod field {
    /// Default field width in points
    pub const WIDTH: f32 = 400.0;
    /// Default field height in points
    pub const HEIGHT: f32 = 700.0;
    /// Height of the ground strip; touching it is terminal
    pub const GROUND_HEIGHT: f32 = 60.0;
    /// Avatar horizontal position as a fraction of field width
    pub const AVATAR_X_RATIO: f32 = 1.0 / 2.5;
    /// Remote shadow horizontal position as a fraction of field width
    pub const SHADOW_X_RATIO: f32 = 0.6;
    /// Avatar collision radius (sprite scaled by 0.85)
    pub const AVATAR_RADIUS: f32 = 25.0;
    /// Distance credited per second of flight (0.1 m per frame at 60 Hz)
    pub const DISTANCE_PER_SECOND: f32 = 6.0;
}

/// Obstacle spawning constants
pub mod obstacle {
    /// Width of each obstacle half
    pub const WIDTH: f32 = 80.0;
    /// Width of the invisible score zone trailing each pair
    pub const SCORE_ZONE_WIDTH: f32 = 5.0;
    /// Gap-center band, as fractions of field height
    pub const GAP_BAND_MIN: f32 = 0.25;
    pub const GAP_BAND_MAX: f32 = 0.75;

    /// Baseline tuning used when no difficulty level is selected
    pub const BASELINE_GAP: f32 = 150.0;
    pub const BASELINE_SPEED: f32 = 100.0;
    pub const BASELINE_INTERVAL: f32 = 2.0;

    /// Moving-gap pairs: oscillation amplitude and period
    pub const MOVING_GAP_AMPLITUDE: f32 = 40.0;
    pub const MOVING_GAP_PERIOD: f32 = 2.0;
    /// Sizing pairs: extra gap height at full opening, and one open-close cycle
    pub const SIZING_GAP_GROWTH: f32 = 80.0;
    pub const SIZING_GAP_PERIOD: f32 = 3.0;
    /// Reward pairs: coin radius at the middle of the gap
    pub const REWARD_RADIUS: f32 = 20.0;
    /// Ghost halves are drawn at this opacity
    pub const GHOST_OPACITY: f32 = 0.5;
}

/// Difficulty tiers and adaptive difficulty
pub mod difficulty {
    pub const MIN_LEVEL: u8 = 1;
    pub const MAX_LEVEL: u8 = 5;
    /// Level used when adaptive difficulty starts
    pub const DEFAULT_LEVEL: u8 = MIN_LEVEL;
    /// (gap, speed, spawn interval) per level, index 0 = level 1
    pub const TABLE: [(f32, f32, f32); 5] = [
        (180.0, 100.0, 2.5),
        (160.0, 120.0, 2.2),
        (140.0, 140.0, 1.9),
        (120.0, 160.0, 1.7),
        (100.0, 180.0, 1.5),
    ];
    /// Sessions required before the level starts adapting (strictly more than)
    pub const MIN_PLAY_COUNT: u32 = 5;
    /// Recent scores averaged for the rolling baseline
    pub const HISTORY_WINDOW: usize = 10;
    /// Score above average * RAISE_RATIO raises the level
    pub const RAISE_RATIO: f32 = 1.5;
    /// Score below average * LOWER_RATIO lowers the level
    pub const LOWER_RATIO: f32 = 0.5;
    /// Chance per level that a spawned pair is special
    pub const SPECIAL_CHANCE_PER_LEVEL: f32 = 0.05;
    pub const SPECIAL_CHANCE_CAP: f32 = 0.25;
}

/// Presentation cues the host renders
pub mod cue {
    /// Score label pulse: scale up to this factor, then back
    pub const SCORE_PULSE_SCALE: f32 = 1.5;
    /// Duration of each half of the pulse
    pub const SCORE_PULSE_HALF: f32 = 0.1;
    /// Crash flash: 4 red/sky flashes of 0.05s each way
    pub const CRASH_SEQUENCE: f32 = 0.4;
    /// Shadow avatar opacity
    pub const SHADOW_OPACITY: f32 = 0.5;
}

/// Networking constants
pub mod net {
    /// Maximum accepted peer message size in bytes
    pub const MAX_MESSAGE_SIZE: usize = 1024;
    /// Inbound hand-off queue capacity (several seconds at 60 Hz)
    pub const INBOUND_QUEUE_CAPACITY: usize = 256;
    /// Players in a head-to-head match
    pub const MATCH_PLAYERS: usize = 2;
}

/// Game-services identifiers
pub mod services {
    pub const DEFAULT_LEADERBOARD: &str = "floppyduck.highscores";

    pub const ACHIEVEMENT_FIRST_FLIGHT: &str = "floppyduck.firstflight";
    pub const ACHIEVEMENT_DISTANCE_FLYER: &str = "floppyduck.distanceflyer";
    pub const ACHIEVEMENT_FLAP_MASTER: &str = "floppyduck.flapmaster";
    pub const ACHIEVEMENT_HIGH_SCORER: &str = "floppyduck.highscorer";

    /// Distance that completes the distance achievement
    pub const DISTANCE_TARGET: f64 = 1000.0;
    /// Flaps that complete the flap achievement
    pub const FLAPS_TARGET: f64 = 1000.0;
    /// Score that completes the high-score achievement
    pub const SCORE_TARGET: f64 = 50.0;
}

/// Look up the (gap, speed, interval) triple for a difficulty level
pub fn difficulty_settings(level: u8) -> (f32, f32, f32) {
    let level = level.clamp(difficulty::MIN_LEVEL, difficulty::MAX_LEVEL);
    difficulty::TABLE[(level - 1) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dt_matches_tick_rate() {
        assert!((physics::DT * physics::TICK_RATE as f32 - 1.0).abs() < 1e-6);
        assert_eq!(physics::TICK_DURATION_MS, 16);
    }

    #[test]
    fn test_difficulty_level_three_is_default_tier() {
        assert_eq!(difficulty_settings(3), (140.0, 140.0, 1.9));
    }

    #[test]
    fn test_difficulty_out_of_range_clamps() {
        assert_eq!(difficulty_settings(0), difficulty_settings(1));
        assert_eq!(difficulty_settings(9), difficulty_settings(5));
    }

    #[test]
    fn test_difficulty_gets_harder() {
        for pair in difficulty::TABLE.windows(2) {
            let (easy, hard) = (pair[0], pair[1]);
            assert!(hard.0 < easy.0, "gap shrinks");
            assert!(hard.1 > easy.1, "speed grows");
            assert!(hard.2 < easy.2, "interval shrinks");
        }
    }

    #[test]
    fn test_gap_band_fits_field() {
        let band = (obstacle::GAP_BAND_MAX - obstacle::GAP_BAND_MIN) * field::HEIGHT;
        assert!(band > obstacle::BASELINE_GAP);
    }
}
