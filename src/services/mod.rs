//! Host-side collaborators injected into the game flow

pub mod achievements;
pub mod sound;
pub mod stats;
pub mod theme;

use achievements::{EventSink, NullSink};
use sound::{MuteState, SilentSink, SoundSink};
use stats::{MemoryStatsStore, StatsStore};
use theme::{ClockTheme, ThemeProvider};

/// Everything the game needs from its host
pub struct Services {
    pub stats: Box<dyn StatsStore>,
    pub events: Box<dyn EventSink>,
    pub sound: MuteState,
    pub theme: Box<dyn ThemeProvider>,
}

impl Services {
    pub fn new(
        stats: Box<dyn StatsStore>,
        events: Box<dyn EventSink>,
        sound: Box<dyn SoundSink>,
        theme: Box<dyn ThemeProvider>,
    ) -> Self {
        Self {
            stats,
            events,
            sound: MuteState::new(sound),
            theme,
        }
    }

    /// In-memory stats, no events, no audio
    pub fn headless() -> Self {
        Self::new(
            Box::new(MemoryStatsStore::new()),
            Box::new(NullSink),
            Box::new(SilentSink),
            Box::new(ClockTheme),
        )
    }
}
