//! Top-level game state machine
//!
//! `GameFlow` owns the current screen, the active session, the optional
//! head-to-head link and every injected service. The host feeds it touches
//! and frame ticks; everything else (saving stats, reporting achievements,
//! adaptive difficulty, remote mirroring) happens inside.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::game::constants::{cue, services::DEFAULT_LEADERBOARD};
use crate::game::difficulty::{AdaptiveDifficulty, DifficultyLevel, SpawnSettings};
use crate::game::session::{
    MatchSession, SessionEvent, SessionEvents, SessionMode, SessionSetup, SessionSummary,
};
use crate::game::state::{PlayField, PlayerId};
use crate::game::systems::collision::ContactEvent;
use crate::game::ui::{Button, ScreenLayout};
use crate::metrics::Metrics;
use crate::net::channel::ConnectionState;
use crate::net::matchmaking::MatchManager;
use crate::net::protocol::PeerEvent;
use crate::net::sync::{ApplyOutcome, LinkEvent, PeerLink};
use crate::services::achievements::{AchievementTracker, GameEvent};
use crate::services::sound::Sound;
use crate::services::stats::LifetimeStats;
use crate::services::theme::{EnvironmentTheme, GameTheme, Skin};
use crate::services::Services;
use crate::util::vec2::Vec2;

/// Active screen; exactly one at a time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GameState {
    #[default]
    MainMenu,
    Playing,
    GameOver,
    Profile,
    Leaderboard,
    Matchmaking,
}

/// Numbers shown on the profile screen
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
    pub high_score: u32,
    pub total_flights: u32,
    pub total_distance: f64,
    pub total_flaps: u64,
    pub average_distance: f64,
    pub average_flaps: f64,
    pub selected_skin: Skin,
    pub unlocked_skins: Vec<Skin>,
    pub selected_theme: GameTheme,
    pub unlocked_themes: Vec<GameTheme>,
}

impl From<&LifetimeStats> for ProfileView {
    fn from(stats: &LifetimeStats) -> Self {
        Self {
            high_score: stats.high_score,
            total_flights: stats.total_flights,
            total_distance: stats.total_distance,
            total_flaps: stats.total_flaps,
            average_distance: stats.average_distance(),
            average_flaps: stats.average_flaps(),
            selected_skin: stats.selected_skin,
            unlocked_skins: Skin::unlocked(stats),
            selected_theme: stats.selected_theme,
            unlocked_themes: GameTheme::unlocked(stats),
        }
    }
}

pub struct GameFlow {
    state: GameState,
    config: GameConfig,
    field: PlayField,
    local_id: PlayerId,
    services: Services,
    achievements: AchievementTracker,
    difficulty: AdaptiveDifficulty,
    session: Option<MatchSession>,
    link: Option<PeerLink>,
    matchmaking: MatchManager,
    layout: ScreenLayout,
    /// Seconds left in the crash sequence
    crash_timer: f32,
    can_restart: bool,
    /// Highest-priority event waiting for the next broadcast
    pending_event: Option<PeerEvent>,
    last_summary: Option<SessionSummary>,
    sessions_started: u64,
    seed_rng: StdRng,
    metrics: Arc<Metrics>,
}

impl GameFlow {
    pub fn new(config: GameConfig, services: Services, metrics: Arc<Metrics>) -> Self {
        let field = config.field();
        let difficulty = AdaptiveDifficulty::new(
            config.difficulty.unwrap_or(DifficultyLevel::EASIEST),
            config.adaptive_difficulty,
        );
        let seed_rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            state: GameState::MainMenu,
            layout: ScreenLayout::for_state(GameState::MainMenu, &field),
            config,
            field,
            local_id: Uuid::new_v4(),
            services,
            achievements: AchievementTracker::new(),
            difficulty,
            session: None,
            link: None,
            matchmaking: MatchManager::new(),
            crash_timer: 0.0,
            can_restart: false,
            pending_event: None,
            last_summary: None,
            sessions_started: 0,
            seed_rng,
            metrics,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn local_id(&self) -> PlayerId {
        self.local_id
    }

    pub fn session(&self) -> Option<&MatchSession> {
        self.session.as_ref()
    }

    pub fn layout(&self) -> &ScreenLayout {
        &self.layout
    }

    pub fn matchmaking(&self) -> &MatchManager {
        &self.matchmaking
    }

    pub fn difficulty(&self) -> &AdaptiveDifficulty {
        &self.difficulty
    }

    pub fn can_restart(&self) -> bool {
        self.can_restart
    }

    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    pub fn is_muted(&self) -> bool {
        self.services.sound.is_muted()
    }

    pub fn score(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.score())
    }

    pub fn profile(&self) -> ProfileView {
        ProfileView::from(&self.services.stats.load_stats())
    }

    pub fn theme(&self) -> EnvironmentTheme {
        self.services.theme.current_theme()
    }

    pub fn select_skin(&mut self, skin: Skin) -> bool {
        self.services.stats.select_skin(skin)
    }

    pub fn select_theme(&mut self, theme: GameTheme) -> bool {
        let selected = self.services.stats.select_theme(theme);
        if selected {
            debug!("Game theme: {}", theme.name());
        }
        selected
    }

    /// Obstacle tuning for the next session
    pub fn spawn_settings(&self) -> SpawnSettings {
        if self.difficulty.is_enabled() || self.config.difficulty.is_some() {
            self.difficulty.settings()
        } else {
            SpawnSettings::baseline()
        }
    }

    /// Route a touch; the mute toggle wins in every state
    pub fn handle_touch(&mut self, point: Vec2) -> Option<Button> {
        let button = self.layout.hit_test(point);
        if button == Some(Button::Mute) {
            let muted = self.services.sound.toggle();
            debug!("Muted: {}", muted);
            return button;
        }

        if self.state == GameState::Playing {
            self.flap();
            return None;
        }

        if let Some(button) = button {
            self.press(button);
        }
        button
    }

    fn press(&mut self, button: Button) {
        match (self.state, button) {
            (GameState::MainMenu, Button::Start) => self.start_game(),
            (GameState::MainMenu, Button::Leaderboard) => {
                self.services.events.report(GameEvent::ShowLeaderboard);
                self.enter(GameState::Leaderboard);
            }
            (GameState::MainMenu, Button::Matchmaking) => {
                if self.matchmaking.find_match() {
                    self.services.events.report(GameEvent::MatchmakingRequested);
                }
                self.enter(GameState::Matchmaking);
            }
            (GameState::MainMenu, Button::Profile) => self.enter(GameState::Profile),
            (GameState::MainMenu, Button::Achievements) => {
                self.services.events.report(GameEvent::ShowAchievements);
            }

            (GameState::GameOver, Button::PlayAgain) if self.can_restart => self.start_game(),
            (GameState::GameOver, Button::MainMenu) if self.can_restart => self.show_main_menu(),

            (GameState::Matchmaking, Button::DismissNotice) => {
                self.matchmaking.dismiss_notice();
                self.show_main_menu();
            }
            (GameState::Matchmaking, Button::Back) => {
                self.matchmaking.on_cancelled();
                self.show_main_menu();
            }
            (GameState::Profile | GameState::Leaderboard, Button::Back) => self.show_main_menu(),

            _ => {}
        }
    }

    /// Flap the local avatar; only meaningful while playing
    pub fn flap(&mut self) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        let flapped = self.session.as_mut().is_some_and(|s| s.flap());
        if flapped {
            self.services.sound.play(Sound::Flap);
            Metrics::incr(&self.metrics.flaps);
            self.queue_peer_event(PeerEvent::Flap);
        }
        flapped
    }

    /// Advance one frame
    pub fn update(&mut self, dt: f32) -> SessionEvents {
        self.poll_link();

        match self.state {
            GameState::Playing => self.step_session(dt),
            GameState::GameOver => {
                // The peer hears GameOver every frame until the link is dropped
                self.broadcast_local();
                if !self.can_restart {
                    self.crash_timer -= dt;
                    if self.crash_timer <= 0.0 {
                        self.can_restart = true;
                    }
                }
                SessionEvents::new()
            }
            _ => SessionEvents::new(),
        }
    }

    fn step_session(&mut self, dt: f32) -> SessionEvents {
        let started = Instant::now();
        let Some(session) = self.session.as_mut() else {
            return SessionEvents::new();
        };
        let events = session.tick(dt);
        match self.react(&events) {
            Some(summary) => self.enter_game_over(summary),
            None => self.broadcast_local(),
        }
        self.metrics.record_tick_time(started.elapsed());
        events
    }

    /// Resolve a contact reported by the host's physics
    pub fn handle_contact(&mut self, contact: &ContactEvent) -> SessionEvents {
        let playing = self.state == GameState::Playing;
        let Some(session) = self.session.as_mut() else {
            return SessionEvents::new();
        };
        let events = session.apply_contact(contact, playing);
        if let Some(summary) = self.react(&events) {
            self.enter_game_over(summary);
        }
        events
    }

    /// Side effects of session events; returns the summary if it ended
    fn react(&mut self, events: &[SessionEvent]) -> Option<SessionSummary> {
        let mut ended = None;
        for event in events {
            match event {
                SessionEvent::Scored { score, .. } => {
                    debug!("Score {}", score);
                    self.services.sound.play(Sound::Score);
                    Metrics::incr(&self.metrics.points_scored);
                    self.queue_peer_event(PeerEvent::ScorePoint);
                }
                SessionEvent::AvatarTerminated { .. } => {
                    self.services.sound.play(Sound::Crash);
                    self.queue_peer_event(PeerEvent::HitPipe);
                }
                SessionEvent::Ended(summary) => ended = Some(*summary),
                SessionEvent::ObstacleSpawned(_) => {}
            }
        }
        ended
    }

    /// Keep only the most important event for the next update
    fn queue_peer_event(&mut self, event: PeerEvent) {
        let rank = |e: PeerEvent| match e {
            PeerEvent::Flap => 0,
            PeerEvent::ScorePoint => 1,
            PeerEvent::HitPipe => 2,
            PeerEvent::GameOver => 3,
        };
        if self.pending_event.map_or(true, |p| rank(event) > rank(p)) {
            self.pending_event = Some(event);
        }
    }

    /// Send the local avatar to the peer
    ///
    /// A downed avatar tags every update so one lost send cannot leave the
    /// peer waiting forever.
    fn broadcast_local(&mut self) {
        let standing = match self.session.as_ref() {
            Some(session) if session.mode() == SessionMode::HeadToHead && self.link.is_some() => {
                if session.is_ended() {
                    Some(PeerEvent::GameOver)
                } else if session.avatar().is_terminated() {
                    Some(PeerEvent::HitPipe)
                } else {
                    None
                }
            }
            _ => return,
        };
        if let Some(event) = standing {
            self.queue_peer_event(event);
        }

        let (Some(link), Some(session)) = (self.link.as_mut(), self.session.as_ref()) else {
            return;
        };
        link.broadcast(session.avatar(), session.score(), self.pending_event.take());
    }

    /// Apply everything the peer sent since the last frame
    fn poll_link(&mut self) {
        let events = match self.link.as_mut() {
            Some(link) => link.drain(),
            None => return,
        };

        for event in events {
            let ended = match event {
                LinkEvent::Update(update) => {
                    if self.state != GameState::Playing {
                        continue;
                    }
                    let Some(session) = self.session.as_mut() else {
                        continue;
                    };
                    let (outcome, ended) = session.apply_remote(&update);
                    if outcome == ApplyOutcome::Stale {
                        Metrics::incr(&self.metrics.stale_updates);
                    }
                    ended
                }
                LinkEvent::Disconnected => {
                    self.matchmaking
                        .on_connection_changed(ConnectionState::Disconnected);
                    match (self.state, self.session.as_mut()) {
                        (GameState::Playing, Some(session)) => session.remote_disconnected(),
                        _ => None,
                    }
                }
            };

            if let Some(SessionEvent::Ended(summary)) = ended {
                self.enter_game_over(summary);
            }
        }
    }

    /// The external matchmaker paired us; start head-to-head
    pub fn on_match_found(&mut self, opponent: PlayerId, link: PeerLink) -> bool {
        if self.state != GameState::Matchmaking {
            link.close();
            return false;
        }
        self.matchmaking.on_match_found(opponent);
        self.link = Some(link);
        self.start_session();
        true
    }

    pub fn on_match_failed(&mut self, reason: impl Into<String>) {
        if self.state != GameState::Matchmaking {
            return;
        }
        self.matchmaking.on_match_failed(reason);
        self.layout = ScreenLayout::for_state(GameState::Matchmaking, &self.field)
            .with_notice(&self.field);
    }

    /// Start a fresh solo session
    pub fn start_game(&mut self) {
        self.leave_match();
        self.start_session();
    }

    fn start_session(&mut self) {
        let mode = if self.link.is_some() && self.matchmaking.start_match() {
            SessionMode::HeadToHead
        } else {
            SessionMode::Solo
        };

        let seed = match self.config.rng_seed {
            Some(seed) => seed.wrapping_add(self.sessions_started),
            None => self.seed_rng.gen(),
        };
        let special_chance = if self.difficulty.is_enabled() {
            self.difficulty.level().special_pair_chance()
        } else {
            0.0
        };
        let setup = SessionSetup {
            field: self.field,
            physics: self.config.physics(),
            spawn: self.spawn_settings(),
            special_chance,
            seed,
            mode,
        };

        self.session = Some(MatchSession::new(setup));
        self.sessions_started += 1;
        self.pending_event = None;
        self.can_restart = false;
        self.crash_timer = 0.0;

        self.services.stats.record_flight();
        self.achievements.first_flight(self.services.events.as_mut());
        self.services.sound.play(Sound::Quack);
        Metrics::incr(&self.metrics.sessions_started);

        info!(
            "Starting {:?} session at difficulty {} (gap {})",
            mode,
            self.difficulty.level().get(),
            setup.spawn.gap
        );
        self.enter(GameState::Playing);
    }

    fn enter_game_over(&mut self, summary: SessionSummary) {
        if self.state != GameState::Playing {
            return;
        }
        self.broadcast_local();
        self.last_summary = Some(summary);
        self.crash_timer = cue::CRASH_SEQUENCE;
        self.can_restart = false;
        Metrics::incr(&self.metrics.sessions_ended);

        let saved = self.services.stats.save_stats(
            summary.score,
            summary.stats.distance,
            summary.stats.flaps,
        );
        if saved.new_high_score {
            info!("New high score: {}", summary.score);
            self.services.events.report(GameEvent::ScoreSubmitted {
                leaderboard: DEFAULT_LEADERBOARD.to_string(),
                score: summary.score,
            });
        }

        let sink = self.services.events.as_mut();
        self.achievements.distance_flown(sink, saved.stats.total_distance);
        self.achievements.flaps(sink, saved.stats.total_flaps);
        self.achievements.high_score(sink, saved.stats.high_score);

        self.difficulty.record_session(summary.score);
        self.matchmaking.complete();
        self.enter(GameState::GameOver);
    }

    pub fn show_main_menu(&mut self) {
        self.leave_match();
        self.session = None;
        self.enter(GameState::MainMenu);
    }

    /// Drop any head-to-head link, telling the peer we are done first
    fn leave_match(&mut self) {
        if self.link.is_none() {
            return;
        }
        self.queue_peer_event(PeerEvent::GameOver);
        self.broadcast_local();
        if let Some(link) = self.link.take() {
            link.close();
            self.matchmaking.end_match();
        }
    }

    fn enter(&mut self, state: GameState) {
        if self.state != state {
            debug!("{:?} -> {:?}", self.state, state);
        }
        self.state = state;
        self.layout = ScreenLayout::for_state(state, &self.field);
    }
}
