//! Time-of-day environment themes, unlockable game themes and duck skins

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::services::stats::LifetimeStats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentTheme {
    Dawn,
    #[default]
    Day,
    Dusk,
    Night,
}

impl EnvironmentTheme {
    /// Theme for a local hour in 0..24
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=7 => Self::Dawn,
            8..=17 => Self::Day,
            18..=20 => Self::Dusk,
            _ => Self::Night,
        }
    }

    /// Sky color as RGB
    pub fn sky_color(self) -> (u8, u8, u8) {
        match self {
            Self::Dawn => (244, 164, 96),
            Self::Day => (113, 197, 207),
            Self::Dusk => (255, 99, 71),
            Self::Night => (25, 25, 112),
        }
    }

    /// Ambient light, 1.0 = full daylight
    pub fn light_level(self) -> f32 {
        match self {
            Self::Dawn => 0.7,
            Self::Day => 1.0,
            Self::Dusk => 0.6,
            Self::Night => 0.3,
        }
    }
}

/// Where the current environment theme comes from
pub trait ThemeProvider: Send {
    fn current_theme(&self) -> EnvironmentTheme;
}

/// Follows the local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockTheme;

impl ThemeProvider for ClockTheme {
    fn current_theme(&self) -> EnvironmentTheme {
        EnvironmentTheme::from_hour(chrono::Local::now().hour())
    }
}

/// Always the same theme
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTheme(pub EnvironmentTheme);

impl ThemeProvider for FixedTheme {
    fn current_theme(&self) -> EnvironmentTheme {
        self.0
    }
}

/// Unlockable art set for the background, ground and obstacles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameTheme {
    #[default]
    Classic,
    Meadow,
    Desert,
    Snow,
    Neon,
}

impl GameTheme {
    pub const ALL: [GameTheme; 5] = [
        GameTheme::Classic,
        GameTheme::Meadow,
        GameTheme::Desert,
        GameTheme::Snow,
        GameTheme::Neon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GameTheme::Classic => "Classic",
            GameTheme::Meadow => "Meadow",
            GameTheme::Desert => "Desert",
            GameTheme::Snow => "Snow",
            GameTheme::Neon => "Neon",
        }
    }

    pub fn background_texture(self) -> String {
        format!("background_{}", self.name().to_ascii_lowercase())
    }

    pub fn ground_texture(self) -> String {
        format!("ground_{}", self.name().to_ascii_lowercase())
    }

    /// (up, down) obstacle textures
    pub fn obstacle_textures(self) -> (String, String) {
        let base = format!("pipe_{}", self.name().to_ascii_lowercase());
        (format!("{}_up", base), format!("{}_down", base))
    }

    /// Menu backdrop as RGB
    pub fn menu_color(self) -> (u8, u8, u8) {
        match self {
            GameTheme::Classic => (113, 197, 207),
            GameTheme::Meadow => (124, 185, 99),
            GameTheme::Desert => (244, 164, 96),
            GameTheme::Snow => (200, 230, 255),
            GameTheme::Neon => (0, 0, 30),
        }
    }

    pub fn is_unlocked(self, stats: &LifetimeStats) -> bool {
        match self {
            GameTheme::Classic => true,
            GameTheme::Meadow => stats.total_flights >= 50,
            GameTheme::Desert => stats.games_played >= 100,
            GameTheme::Snow => stats.high_score >= 30,
            GameTheme::Neon => stats.total_distance >= 5_000.0,
        }
    }

    pub fn unlock_requirement(self) -> &'static str {
        match self {
            GameTheme::Classic => "Available by default",
            GameTheme::Meadow => "Complete 50 flights",
            GameTheme::Desert => "Play 100 games",
            GameTheme::Snow => "Reach a score of 30",
            GameTheme::Neon => "Travel 5,000 m",
        }
    }

    pub fn unlocked(stats: &LifetimeStats) -> Vec<GameTheme> {
        Self::ALL
            .into_iter()
            .filter(|t| t.is_unlocked(stats))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skin {
    #[default]
    Classic,
    Golden,
    Pixel,
    Zombie,
    Robot,
    Swimmer,
}

impl Skin {
    pub const ALL: [Skin; 6] = [
        Skin::Classic,
        Skin::Golden,
        Skin::Pixel,
        Skin::Zombie,
        Skin::Robot,
        Skin::Swimmer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Skin::Classic => "Classic",
            Skin::Golden => "Golden",
            Skin::Pixel => "Pixel",
            Skin::Zombie => "Zombie",
            Skin::Robot => "Robot",
            Skin::Swimmer => "Swimmer",
        }
    }

    pub fn atlas_name(self) -> String {
        format!("duck_{}", self.name().to_ascii_lowercase())
    }

    /// Wing-flap animation frames
    pub fn frame_count(self) -> u32 {
        match self {
            Skin::Zombie => 3,
            Skin::Robot => 4,
            _ => 2,
        }
    }

    pub fn is_unlocked(self, stats: &LifetimeStats) -> bool {
        match self {
            Skin::Classic => true,
            Skin::Golden => stats.high_score >= 50,
            Skin::Pixel => stats.total_flights >= 100,
            Skin::Zombie => stats.total_flaps >= 1000,
            Skin::Robot => stats.games_played >= 200,
            Skin::Swimmer => stats.total_distance >= 10_000.0,
        }
    }

    pub fn unlock_requirement(self) -> &'static str {
        match self {
            Skin::Classic => "Available by default",
            Skin::Golden => "Reach a score of 50",
            Skin::Pixel => "Complete 100 flights",
            Skin::Zombie => "Flap 1,000 times",
            Skin::Robot => "Play 200 games",
            Skin::Swimmer => "Travel 10,000 m",
        }
    }

    pub fn unlocked(stats: &LifetimeStats) -> Vec<Skin> {
        Self::ALL
            .into_iter()
            .filter(|s| s.is_unlocked(stats))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_hour_boundaries() {
        assert_eq!(EnvironmentTheme::from_hour(4), EnvironmentTheme::Night);
        assert_eq!(EnvironmentTheme::from_hour(5), EnvironmentTheme::Dawn);
        assert_eq!(EnvironmentTheme::from_hour(7), EnvironmentTheme::Dawn);
        assert_eq!(EnvironmentTheme::from_hour(8), EnvironmentTheme::Day);
        assert_eq!(EnvironmentTheme::from_hour(17), EnvironmentTheme::Day);
        assert_eq!(EnvironmentTheme::from_hour(18), EnvironmentTheme::Dusk);
        assert_eq!(EnvironmentTheme::from_hour(21), EnvironmentTheme::Night);
        assert_eq!(EnvironmentTheme::from_hour(0), EnvironmentTheme::Night);
    }

    #[test]
    fn test_night_is_darkest() {
        for theme in [EnvironmentTheme::Dawn, EnvironmentTheme::Day, EnvironmentTheme::Dusk] {
            assert!(theme.light_level() > EnvironmentTheme::Night.light_level());
        }
    }

    #[test]
    fn test_fresh_player_has_only_classic() {
        let stats = LifetimeStats::default();
        assert_eq!(Skin::unlocked(&stats), vec![Skin::Classic]);
    }

    #[test]
    fn test_skin_unlock_thresholds() {
        let stats = LifetimeStats {
            high_score: 50,
            total_flaps: 999,
            total_distance: 10_000.0,
            ..LifetimeStats::default()
        };
        assert!(Skin::Golden.is_unlocked(&stats));
        assert!(!Skin::Zombie.is_unlocked(&stats));
        assert!(Skin::Swimmer.is_unlocked(&stats));
        assert!(!Skin::Robot.is_unlocked(&stats));
    }

    #[test]
    fn test_game_theme_unlock_thresholds() {
        assert_eq!(GameTheme::unlocked(&LifetimeStats::default()), vec![GameTheme::Classic]);

        let stats = LifetimeStats {
            total_flights: 50,
            games_played: 99,
            high_score: 30,
            total_distance: 4_999.0,
            ..LifetimeStats::default()
        };
        assert_eq!(
            GameTheme::unlocked(&stats),
            vec![GameTheme::Classic, GameTheme::Meadow, GameTheme::Snow]
        );
        assert_eq!(GameTheme::Desert.unlock_requirement(), "Play 100 games");
    }

    #[test]
    fn test_game_theme_textures() {
        assert_eq!(GameTheme::Snow.background_texture(), "background_snow");
        assert_eq!(GameTheme::Neon.ground_texture(), "ground_neon");
        assert_eq!(
            GameTheme::Desert.obstacle_textures(),
            ("pipe_desert_up".to_string(), "pipe_desert_down".to_string())
        );
    }

    #[test]
    fn test_atlas_name() {
        assert_eq!(Skin::Golden.atlas_name(), "duck_golden");
        assert_eq!(Skin::Robot.frame_count(), 4);
    }
}
