use tracing::{info, warn};

use crate::game::state::PlayerId;
use crate::net::channel::ConnectionState;

/// Where the head-to-head match stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchState {
    #[default]
    NotConnected,
    /// Request handed to the external matchmaker
    Connecting,
    /// Opponent found, not yet playing
    Connected,
    Playing,
    Complete,
    /// Opponent dropped mid-match
    Disconnected,
}

/// User-facing message that stays until dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

/// Tracks the outcome of external matchmaking for one local player
#[derive(Debug, Default)]
pub struct MatchManager {
    state: MatchState,
    opponent: Option<PlayerId>,
    notice: Option<Notice>,
}

impl MatchManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn opponent(&self) -> Option<PlayerId> {
        self.opponent
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Begin a search; ignored while a match is already set up
    pub fn find_match(&mut self) -> bool {
        match self.state {
            MatchState::NotConnected | MatchState::Complete | MatchState::Disconnected => {
                self.state = MatchState::Connecting;
                self.opponent = None;
                self.notice = None;
                true
            }
            _ => false,
        }
    }

    pub fn on_match_found(&mut self, opponent: PlayerId) {
        info!("Match found against {}", opponent);
        self.opponent = Some(opponent);
        self.state = MatchState::Connected;
    }

    /// Matchmaking failed; no retry is attempted
    pub fn on_match_failed(&mut self, reason: impl Into<String>) {
        let message = reason.into();
        warn!("Matchmaking failed: {}", message);
        self.state = MatchState::NotConnected;
        self.opponent = None;
        self.notice = Some(Notice { message });
    }

    pub fn on_cancelled(&mut self) {
        self.state = MatchState::NotConnected;
        self.opponent = None;
    }

    /// Returns the notice that was showing, if any
    pub fn dismiss_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Only a connected match can start
    pub fn start_match(&mut self) -> bool {
        if self.state == MatchState::Connected {
            self.state = MatchState::Playing;
            true
        } else {
            false
        }
    }

    /// Both peers finished
    pub fn complete(&mut self) {
        if self.state == MatchState::Playing {
            self.state = MatchState::Complete;
        }
    }

    /// Local player left (menu, restart)
    pub fn end_match(&mut self) {
        self.state = MatchState::NotConnected;
        self.opponent = None;
    }

    /// Transport reported a peer connection change
    ///
    /// Returns true when this disconnect ends an active match.
    pub fn on_connection_changed(&mut self, state: ConnectionState) -> bool {
        match (state, self.state) {
            (ConnectionState::Disconnected, MatchState::Playing | MatchState::Connected) => {
                warn!("Opponent disconnected");
                self.state = MatchState::Disconnected;
                true
            }
            (ConnectionState::Connected, MatchState::Connecting) => {
                self.state = MatchState::Connected;
                false
            }
            _ => false,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, MatchState::Connected | MatchState::Playing)
    }
}
