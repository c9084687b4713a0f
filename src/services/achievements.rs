//! Leaderboard and achievement reporting
//!
//! The game never talks to a game-services backend directly; it reports
//! [`GameEvent`]s to an [`EventSink`] supplied by the host.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::game::constants::services::{
    ACHIEVEMENT_DISTANCE_FLYER, ACHIEVEMENT_FIRST_FLIGHT, ACHIEVEMENT_FLAP_MASTER,
    ACHIEVEMENT_HIGH_SCORER, DISTANCE_TARGET, FLAPS_TARGET, SCORE_TARGET,
};

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ScoreSubmitted { leaderboard: String, score: u32 },
    AchievementProgress { id: String, percent: f64 },
    ShowAchievements,
    ShowLeaderboard,
    MatchmakingRequested,
}

pub trait EventSink: Send {
    fn report(&mut self, event: GameEvent);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn report(&mut self, _event: GameEvent) {}
}

/// Writes every event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn report(&mut self, event: GameEvent) {
        info!("Game service event: {:?}", event);
    }
}

/// Keeps every event; clones share one buffer
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<GameEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GameEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn report(&mut self, event: GameEvent) {
        self.events.lock().push(event);
    }
}

/// Forwards achievement progress only when it goes up
#[derive(Debug, Clone, Default)]
pub struct AchievementTracker {
    progress: HashMap<String, f64>,
}

impl AchievementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self, id: &str) -> f64 {
        self.progress.get(id).copied().unwrap_or(0.0)
    }

    /// Report `percent` for `id` if it beats what was already reported
    pub fn report(&mut self, sink: &mut dyn EventSink, id: &str, percent: f64) -> bool {
        let percent = percent.clamp(0.0, 100.0);
        let current = self.progress.entry(id.to_string()).or_insert(0.0);
        if percent <= *current {
            return false;
        }
        *current = percent;
        debug!("Achievement {} at {:.1}%", id, percent);
        sink.report(GameEvent::AchievementProgress {
            id: id.to_string(),
            percent,
        });
        true
    }

    pub fn first_flight(&mut self, sink: &mut dyn EventSink) -> bool {
        self.report(sink, ACHIEVEMENT_FIRST_FLIGHT, 100.0)
    }

    pub fn distance_flown(&mut self, sink: &mut dyn EventSink, distance: f64) -> bool {
        self.report(sink, ACHIEVEMENT_DISTANCE_FLYER, distance / DISTANCE_TARGET * 100.0)
    }

    pub fn flaps(&mut self, sink: &mut dyn EventSink, flaps: u64) -> bool {
        self.report(sink, ACHIEVEMENT_FLAP_MASTER, flaps as f64 / FLAPS_TARGET * 100.0)
    }

    pub fn high_score(&mut self, sink: &mut dyn EventSink, score: u32) -> bool {
        self.report(sink, ACHIEVEMENT_HIGH_SCORER, f64::from(score) / SCORE_TARGET * 100.0)
    }
}
