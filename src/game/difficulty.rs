//! Difficulty tiers and adaptive difficulty
//!
//! A level in 1..=5 selects the obstacle gap, speed and spawn cadence.
//! Adaptive difficulty nudges the level by at most one step per finished
//! session, comparing the latest score against a rolling average.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::constants::{difficulty, difficulty_settings, obstacle};

/// Obstacle tuning triple
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnSettings {
    pub gap: f32,
    pub speed: f32,
    pub interval: f32,
}

impl SpawnSettings {
    /// Tuning used when no difficulty level is selected
    pub fn baseline() -> Self {
        Self {
            gap: obstacle::BASELINE_GAP,
            speed: obstacle::BASELINE_SPEED,
            interval: obstacle::BASELINE_INTERVAL,
        }
    }

    pub fn for_level(level: DifficultyLevel) -> Self {
        let (gap, speed, interval) = difficulty_settings(level.get());
        Self {
            gap,
            speed,
            interval,
        }
    }
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Discrete difficulty tier, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DifficultyLevel(u8);

impl DifficultyLevel {
    pub const EASIEST: Self = Self(difficulty::MIN_LEVEL);
    pub const HARDEST: Self = Self(difficulty::MAX_LEVEL);

    /// Level clamped into range
    pub fn new(level: u8) -> Self {
        Self(level.clamp(difficulty::MIN_LEVEL, difficulty::MAX_LEVEL))
    }

    /// Strict constructor, `None` outside 1..=5
    pub fn try_new(level: u8) -> Option<Self> {
        (difficulty::MIN_LEVEL..=difficulty::MAX_LEVEL)
            .contains(&level)
            .then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn harder(self) -> Self {
        Self::new(self.0.saturating_add(1))
    }

    pub fn easier(self) -> Self {
        Self::new(self.0.saturating_sub(1))
    }

    pub fn settings(self) -> SpawnSettings {
        SpawnSettings::for_level(self)
    }

    /// Probability that a pair spawned at this level is special
    pub fn special_pair_chance(self) -> f32 {
        (difficulty::SPECIAL_CHANCE_PER_LEVEL * f32::from(self.0)).min(difficulty::SPECIAL_CHANCE_CAP)
    }
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        Self(difficulty::DEFAULT_LEVEL)
    }
}

/// Rolling window of recent session scores
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreHistory {
    scores: VecDeque<u32>,
    play_count: u32,
}

impl ScoreHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, score: u32) {
        if self.scores.len() == difficulty::HISTORY_WINDOW {
            self.scores.pop_front();
        }
        self.scores.push_back(score);
        self.play_count += 1;
    }

    /// Average over the window, 0 when empty
    pub fn average(&self) -> f32 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().map(|&s| s as f32).sum::<f32>() / self.scores.len() as f32
    }

    /// Sessions recorded overall (not just inside the window)
    pub fn play_count(&self) -> u32 {
        self.play_count
    }
}

/// Level selection with optional adaptation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveDifficulty {
    level: DifficultyLevel,
    enabled: bool,
    history: ScoreHistory,
}

impl AdaptiveDifficulty {
    pub fn new(level: DifficultyLevel, enabled: bool) -> Self {
        Self {
            level,
            enabled,
            history: ScoreHistory::new(),
        }
    }

    pub fn level(&self) -> DifficultyLevel {
        self.level
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn settings(&self) -> SpawnSettings {
        self.level.settings()
    }

    /// Adjust the level from one score versus an average
    ///
    /// Does nothing until more than five sessions have been played.
    pub fn update(&mut self, current_score: u32, average_score: f32, play_count: u32) -> DifficultyLevel {
        if !self.enabled || play_count <= difficulty::MIN_PLAY_COUNT {
            return self.level;
        }

        let current = current_score as f32;
        let previous = self.level;
        if current > average_score * difficulty::RAISE_RATIO {
            self.level = self.level.harder();
        } else if current < average_score * difficulty::LOWER_RATIO {
            self.level = self.level.easier();
        }

        if self.level != previous {
            debug!(
                "Difficulty {} -> {} (score {}, average {:.1})",
                previous.get(),
                self.level.get(),
                current_score,
                average_score
            );
        }
        self.level
    }

    /// Record a finished session and recalculate against the rolling average
    ///
    /// The average is taken before the new score joins the window.
    pub fn record_session(&mut self, score: u32) -> DifficultyLevel {
        let average = self.history.average();
        self.history.record(score);
        let play_count = self.history.play_count();
        self.update(score, average, play_count)
    }

    pub fn history(&self) -> &ScoreHistory {
        &self.history
    }
}

impl Default for AdaptiveDifficulty {
    fn default() -> Self {
        Self::new(DifficultyLevel::default(), true)
    }
}
