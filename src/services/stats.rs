//! Lifetime statistics and their persistence
//!
//! Saving is fire-and-forget: the in-memory totals always advance, and a
//! failed write is logged and swallowed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::services::theme::{GameTheme, Skin};

const STATS_FILE: &str = "stats.json";

/// Totals kept across sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifetimeStats {
    pub high_score: u32,
    /// Sessions started
    pub total_flights: u32,
    pub total_distance: f64,
    pub total_flaps: u64,
    /// Sessions finished and saved
    pub games_played: u32,
    /// Running mean over `games_played`
    pub average_score: f64,
    pub selected_skin: Skin,
    pub selected_theme: GameTheme,
}

impl LifetimeStats {
    /// Fold one finished session in; true on a new high score
    pub fn record_session(&mut self, score: u32, distance: f64, flaps: u32) -> bool {
        self.total_distance += distance;
        self.total_flaps += u64::from(flaps);
        self.games_played += 1;
        let n = f64::from(self.games_played);
        self.average_score += (f64::from(score) - self.average_score) / n;

        if score > self.high_score {
            self.high_score = score;
            true
        } else {
            false
        }
    }

    pub fn average_distance(&self) -> f64 {
        if self.total_flights == 0 {
            0.0
        } else {
            self.total_distance / f64::from(self.total_flights)
        }
    }

    pub fn average_flaps(&self) -> f64 {
        if self.total_flights == 0 {
            0.0
        } else {
            self.total_flaps as f64 / f64::from(self.total_flights)
        }
    }
}

/// Result of saving a finished session
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub stats: LifetimeStats,
    /// The caller should submit the score to the leaderboard
    pub new_high_score: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("stats I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("stats file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not determine a data directory")]
    NoDataDir,
}

/// Key-value persistence for lifetime stats
pub trait StatsStore: Send {
    fn load_stats(&self) -> LifetimeStats;

    /// Count a session start
    fn record_flight(&mut self);

    fn save_stats(&mut self, score: u32, distance: f64, flaps: u32) -> SaveOutcome;

    /// Select a skin; ignored (false) while it is still locked
    fn select_skin(&mut self, skin: Skin) -> bool;

    /// Select a game theme; ignored (false) while it is still locked
    fn select_theme(&mut self, theme: GameTheme) -> bool;
}

/// Stats that live only as long as the process
#[derive(Debug, Clone, Default)]
pub struct MemoryStatsStore {
    stats: LifetimeStats,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stats(stats: LifetimeStats) -> Self {
        Self { stats }
    }
}

impl StatsStore for MemoryStatsStore {
    fn load_stats(&self) -> LifetimeStats {
        self.stats.clone()
    }

    fn record_flight(&mut self) {
        self.stats.total_flights += 1;
    }

    fn save_stats(&mut self, score: u32, distance: f64, flaps: u32) -> SaveOutcome {
        let new_high_score = self.stats.record_session(score, distance, flaps);
        SaveOutcome {
            stats: self.stats.clone(),
            new_high_score,
        }
    }

    fn select_skin(&mut self, skin: Skin) -> bool {
        if !skin.is_unlocked(&self.stats) {
            return false;
        }
        self.stats.selected_skin = skin;
        true
    }

    fn select_theme(&mut self, theme: GameTheme) -> bool {
        if !theme.is_unlocked(&self.stats) {
            return false;
        }
        self.stats.selected_theme = theme;
        true
    }
}

/// Stats persisted as a JSON file
#[derive(Debug)]
pub struct JsonStatsStore {
    path: PathBuf,
    stats: LifetimeStats,
}

impl JsonStatsStore {
    /// Open `path`, starting fresh when it is missing or unreadable
    ///
    /// A file that is not valid JSON is moved aside to `<name>.bak` so the
    /// next save cannot overwrite it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stats = match read_stats(&path) {
            Ok(Some(stats)) => stats,
            Ok(None) => LifetimeStats::default(),
            Err(StatsError::Json(e)) => {
                let backup = backup_path(&path);
                match fs::rename(&path, &backup) {
                    Ok(()) => warn!(
                        "Stats at {} are corrupt ({}), moved to {}",
                        path.display(),
                        e,
                        backup.display()
                    ),
                    Err(err) => warn!(
                        "Stats at {} are corrupt ({}) and could not be moved aside: {}",
                        path.display(),
                        e,
                        err
                    ),
                }
                LifetimeStats::default()
            }
            Err(e) => {
                warn!("Ignoring stats at {}: {}", path.display(), e);
                LifetimeStats::default()
            }
        };
        Self { path, stats }
    }

    /// Open the stats file under the platform data directory
    pub fn open_default() -> Result<Self, StatsError> {
        let dirs = ProjectDirs::from("", "", "floppy-duck").ok_or(StatsError::NoDataDir)?;
        Ok(Self::open(dirs.data_dir().join(STATS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) {
        if let Err(e) = write_stats(&self.path, &self.stats) {
            warn!("Failed to save stats to {}: {}", self.path.display(), e);
        } else {
            debug!("Saved stats to {}", self.path.display());
        }
    }
}

impl StatsStore for JsonStatsStore {
    fn load_stats(&self) -> LifetimeStats {
        self.stats.clone()
    }

    fn record_flight(&mut self) {
        // Flushed with the next save
        self.stats.total_flights += 1;
    }

    fn save_stats(&mut self, score: u32, distance: f64, flaps: u32) -> SaveOutcome {
        let new_high_score = self.stats.record_session(score, distance, flaps);
        self.persist();
        SaveOutcome {
            stats: self.stats.clone(),
            new_high_score,
        }
    }

    fn select_skin(&mut self, skin: Skin) -> bool {
        if !skin.is_unlocked(&self.stats) {
            return false;
        }
        self.stats.selected_skin = skin;
        self.persist();
        true
    }

    fn select_theme(&mut self, theme: GameTheme) -> bool {
        if !theme.is_unlocked(&self.stats) {
            return false;
        }
        self.stats.selected_theme = theme;
        self.persist();
        true
    }
}

fn read_stats(path: &Path) -> Result<Option<LifetimeStats>, StatsError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

fn write_stats(path: &Path, stats: &LifetimeStats) -> Result<(), StatsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(stats)?;
    fs::write(path, json)?;
    Ok(())
}
