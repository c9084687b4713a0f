use serde::{Deserialize, Serialize};

use crate::game::constants::net::MAX_MESSAGE_SIZE;
use crate::game::state::{Avatar, PlayerId};
use crate::util::vec2::Vec2;

/// Gameplay moments a peer tags its update with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerEvent {
    Flap,
    HitPipe,
    ScorePoint,
    GameOver,
}

impl PeerEvent {
    /// The sending avatar has stopped for good
    pub fn is_terminal(self) -> bool {
        matches!(self, PeerEvent::HitPipe | PeerEvent::GameOver)
    }
}

/// Per-tick state broadcast from one peer to the other
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub player_id: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub score: u32,
    /// Sender wall clock (ms since epoch)
    pub timestamp_ms: i64,
    /// Sender tick counter, strictly increasing per match
    pub tick: u64,
    pub event: Option<PeerEvent>,
}

impl GameUpdate {
    pub fn from_avatar(
        player_id: PlayerId,
        avatar: &Avatar,
        score: u32,
        tick: u64,
        event: Option<PeerEvent>,
    ) -> Self {
        Self {
            player_id,
            position: avatar.position,
            velocity: avatar.velocity,
            rotation: avatar.rotation,
            score,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            tick,
            event,
        }
    }

    /// Reject NaN/Infinity, which bincode happily round-trips
    pub fn validate(&self) -> Result<(), DecodeError> {
        let floats = [
            self.position.x,
            self.position.y,
            self.velocity.x,
            self.velocity.y,
            self.rotation,
        ];
        if floats.iter().all(|f| f.is_finite()) {
            Ok(())
        } else {
            Err(DecodeError("non-finite value in update".to_string()))
        }
    }
}

/// Encode a message using bincode
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    bincode::serde::encode_to_vec(message, bincode::config::legacy())
        .map_err(|e| EncodeError(e.to_string()))
}

/// Decode a message using bincode
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    bincode::serde::decode_from_slice(data, bincode::config::legacy())
        .map(|(msg, _)| msg)
        .map_err(|e| DecodeError(e.to_string()))
}

/// Decode and validate an inbound peer update
pub fn decode_update(data: &[u8]) -> Result<GameUpdate, DecodeError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(DecodeError(format!(
            "payload of {} bytes exceeds {}",
            data.len(),
            MAX_MESSAGE_SIZE
        )));
    }
    let update: GameUpdate = decode(data)?;
    update.validate()?;
    Ok(update)
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);
