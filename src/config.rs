use std::path::PathBuf;

use crate::game::constants::{field, physics};
use crate::game::difficulty::DifficultyLevel;
use crate::game::state::PlayField;
use crate::game::systems::physics::{PhysicsParams, RotationTuning};

/// Game and runner configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub field_width: f32,
    pub field_height: f32,
    pub ground_height: f32,
    /// Simulation steps per second
    pub tick_rate: u32,
    /// Fixed difficulty tier; `None` uses the baseline tuning
    pub difficulty: Option<DifficultyLevel>,
    /// Let the tier follow recent scores
    pub adaptive_difficulty: bool,
    pub rotation: RotationTuning,
    /// Stats file; `None` uses the platform data directory
    pub stats_path: Option<PathBuf>,
    /// Seed for obstacle layouts; `None` picks one per session
    pub rng_seed: Option<u64>,
    /// Solo sessions the runner plays before the head-to-head demo
    pub demo_sessions: u32,
    /// Pace the runner at wall-clock speed
    pub realtime: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            field_width: field::WIDTH,
            field_height: field::HEIGHT,
            ground_height: field::GROUND_HEIGHT,
            tick_rate: physics::TICK_RATE,
            difficulty: None,
            adaptive_difficulty: false,
            rotation: RotationTuning::Baseline,
            stats_path: None,
            rng_seed: None,
            demo_sessions: 3,
            realtime: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("field dimensions must be positive (got {width}x{height})")]
    InvalidField { width: f32, height: f32 },
    #[error("ground height {ground} must be below field height {height}")]
    GroundTooHigh { ground: f32, height: f32 },
    #[error("tick rate must be 1-240 Hz (got {0})")]
    InvalidTickRate(u32),
}

impl GameConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; invalid values fall back with a warning
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(width) = parse_key::<f32>(&lookup, "FIELD_WIDTH") {
            config.field_width = width;
        }
        if let Some(height) = parse_key::<f32>(&lookup, "FIELD_HEIGHT") {
            config.field_height = height;
        }
        if let Some(ground) = parse_key::<f32>(&lookup, "GROUND_HEIGHT") {
            config.ground_height = ground;
        }

        if let Some(rate) = parse_key::<u32>(&lookup, "TICK_RATE") {
            if (1..=240).contains(&rate) {
                config.tick_rate = rate;
            } else {
                tracing::warn!("TICK_RATE must be 1-240, using default");
            }
        }

        if let Some(level) = parse_key::<u8>(&lookup, "DIFFICULTY") {
            match DifficultyLevel::try_new(level) {
                Some(level) => config.difficulty = Some(level),
                None => tracing::warn!("DIFFICULTY must be 1-5, using baseline tuning"),
            }
        }

        if let Some(adaptive) = lookup("ADAPTIVE_DIFFICULTY") {
            match parse_bool(&adaptive) {
                Some(value) => config.adaptive_difficulty = value,
                None => tracing::warn!("Invalid ADAPTIVE_DIFFICULTY '{}', using default", adaptive),
            }
        }

        if let Some(tuning) = lookup("ROTATION_TUNING") {
            match RotationTuning::parse(&tuning) {
                Some(value) => config.rotation = value,
                None => tracing::warn!("Invalid ROTATION_TUNING '{}', using baseline", tuning),
            }
        }

        if let Some(path) = lookup("STATS_PATH") {
            if !path.trim().is_empty() {
                config.stats_path = Some(PathBuf::from(path));
            }
        }

        config.rng_seed = parse_key::<u64>(&lookup, "RNG_SEED");

        if let Some(sessions) = parse_key::<u32>(&lookup, "DEMO_SESSIONS") {
            config.demo_sessions = sessions;
        }

        if let Some(realtime) = lookup("DEMO_REALTIME") {
            match parse_bool(&realtime) {
                Some(value) => config.realtime = value,
                None => tracing::warn!("Invalid DEMO_REALTIME '{}', using default", realtime),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.field_width > 0.0 && self.field_height > 0.0) {
            return Err(ConfigError::InvalidField {
                width: self.field_width,
                height: self.field_height,
            });
        }
        if self.ground_height < 0.0 || self.ground_height >= self.field_height {
            return Err(ConfigError::GroundTooHigh {
                ground: self.ground_height,
                height: self.field_height,
            });
        }
        if !(1..=240).contains(&self.tick_rate) {
            return Err(ConfigError::InvalidTickRate(self.tick_rate));
        }
        Ok(())
    }

    pub fn field(&self) -> PlayField {
        PlayField::new(self.field_width, self.field_height, self.ground_height)
    }

    pub fn physics(&self) -> PhysicsParams {
        PhysicsParams {
            rotation: self.rotation,
            ..PhysicsParams::default()
        }
    }

    /// Seconds per simulation step
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

fn parse_key<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
