//! Head-to-head state mirroring
//!
//! Each peer broadcasts its avatar once per tick and mirrors the other
//! peer's latest update as a translucent shadow. Updates carry a tick
//! counter; anything not newer than what was already applied is dropped.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::game::constants::cue::SHADOW_OPACITY;
use crate::game::state::{Avatar, PlayerId};
use crate::metrics::Metrics;
use crate::net::channel::{ConnectionState, Inbound, InboundQueue, PeerChannel};
use crate::net::protocol::{self, GameUpdate, PeerEvent};
use crate::util::vec2::Vec2;

/// What applying an update did to the shadow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The remote avatar just stopped
    Terminated,
    /// Older than (or equal to) the last applied tick
    Stale,
}

/// Read-only mirror of the remote avatar
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowAvatar {
    pub player_id: Option<PlayerId>,
    pub position: Vec2,
    pub rotation: f32,
    pub score: u32,
    pub opacity: f32,
    terminated: bool,
    last_tick: Option<u64>,
}

impl ShadowAvatar {
    pub fn new(position: Vec2) -> Self {
        Self {
            player_id: None,
            position,
            rotation: 0.0,
            score: 0,
            opacity: SHADOW_OPACITY,
            terminated: false,
            last_tick: None,
        }
    }

    /// Overwrite the mirrored state from a newer update
    ///
    /// Only the vertical position is taken from the peer; the shadow keeps
    /// its own horizontal slot on screen.
    pub fn apply(&mut self, update: &GameUpdate) -> ApplyOutcome {
        if self.last_tick.is_some_and(|last| update.tick <= last) {
            return ApplyOutcome::Stale;
        }
        self.last_tick = Some(update.tick);
        self.player_id = Some(update.player_id);
        self.position.y = update.position.y;
        self.rotation = update.rotation;
        self.score = update.score;

        match update.event {
            Some(event) if event.is_terminal() && !self.terminated => {
                self.terminated = true;
                ApplyOutcome::Terminated
            }
            _ => ApplyOutcome::Applied,
        }
    }

    /// Treat the remote as finished (disconnect, leave)
    pub fn mark_terminated(&mut self) -> bool {
        !std::mem::replace(&mut self.terminated, true)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }
}

/// Something the link pulled off the inbound queue
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Update(GameUpdate),
    Disconnected,
}

/// One peer's end of a head-to-head match
pub struct PeerLink {
    local_id: PlayerId,
    channel: Box<dyn PeerChannel>,
    inbound: InboundQueue,
    /// Next outbound tick
    tick: u64,
    /// Set once `LinkEvent::Disconnected` has been handed out
    disconnect_reported: bool,
    /// Last send failed; repeats log at debug
    send_failing: bool,
    metrics: Arc<Metrics>,
}

impl PeerLink {
    pub fn new(
        local_id: PlayerId,
        channel: Box<dyn PeerChannel>,
        inbound: InboundQueue,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            local_id,
            channel,
            inbound,
            tick: 0,
            disconnect_reported: false,
            send_failing: false,
            metrics,
        }
    }

    pub fn local_id(&self) -> PlayerId {
        self.local_id
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Encode and send the local avatar state
    ///
    /// Failures are logged and counted; the local game never stops for them.
    pub fn broadcast(&mut self, avatar: &Avatar, score: u32, event: Option<PeerEvent>) -> bool {
        self.tick += 1;
        let update = GameUpdate::from_avatar(self.local_id, avatar, score, self.tick, event);
        let bytes = match protocol::encode(&update) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode update: {}", e);
                Metrics::incr(&self.metrics.send_failures);
                return false;
            }
        };

        match self.channel.send(&bytes) {
            Ok(()) => {
                if std::mem::take(&mut self.send_failing) {
                    debug!("Sends recovered at tick {}", self.tick);
                }
                Metrics::incr(&self.metrics.messages_sent);
                Metrics::add(&self.metrics.bytes_sent, bytes.len() as u64);
                true
            }
            Err(e) => {
                if std::mem::replace(&mut self.send_failing, true) {
                    debug!("Send failed at tick {}: {}", self.tick, e);
                } else {
                    warn!("Send failed at tick {}: {}", self.tick, e);
                }
                Metrics::incr(&self.metrics.send_failures);
                false
            }
        }
    }

    /// Decode everything queued since the last tick
    ///
    /// Malformed payloads are dropped. A disconnect is surfaced exactly once,
    /// whether it arrived as a queued notice or only as a cleared channel flag.
    pub fn drain(&mut self) -> Vec<LinkEvent> {
        // Read the flag first so payloads sent before a hang-up are kept
        let connected = self.channel.is_connected();
        let mut events = Vec::new();
        for item in self.inbound.drain() {
            match item {
                Inbound::Payload(bytes) => {
                    Metrics::incr(&self.metrics.messages_received);
                    Metrics::add(&self.metrics.bytes_received, bytes.len() as u64);
                    match protocol::decode_update(&bytes) {
                        Ok(update) => events.push(LinkEvent::Update(update)),
                        Err(e) => {
                            warn!("Dropping malformed peer payload: {}", e);
                            Metrics::incr(&self.metrics.decode_failures);
                        }
                    }
                }
                Inbound::ConnectionChanged(ConnectionState::Disconnected) => {
                    self.report_disconnect(&mut events);
                }
                Inbound::ConnectionChanged(ConnectionState::Connected) => {}
            }
        }
        if !connected {
            self.report_disconnect(&mut events);
        }
        events
    }

    fn report_disconnect(&mut self, events: &mut Vec<LinkEvent>) {
        if !std::mem::replace(&mut self.disconnect_reported, true) {
            events.push(LinkEvent::Disconnected);
        }
    }

    pub fn is_send_failing(&self) -> bool {
        self.send_failing
    }

    pub fn close(&self) {
        self.channel.disconnect();
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        self.channel.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::channel::loopback_pair;
    use uuid::Uuid;

    fn update(tick: u64, y: f32, event: Option<PeerEvent>) -> GameUpdate {
        GameUpdate {
            player_id: Uuid::nil(),
            position: Vec2::new(160.0, y),
            velocity: Vec2::ZERO,
            rotation: 0.1,
            score: tick as u32,
            timestamp_ms: 0,
            tick,
            event,
        }
    }

    #[test]
    fn test_shadow_applies_newer_updates() {
        let mut shadow = ShadowAvatar::new(Vec2::new(260.0, 350.0));
        assert_eq!(shadow.apply(&update(1, 300.0, None)), ApplyOutcome::Applied);
        assert_eq!(shadow.apply(&update(2, 310.0, None)), ApplyOutcome::Applied);
        assert_eq!(shadow.position, Vec2::new(260.0, 310.0));
        assert_eq!(shadow.score, 2);
        assert_eq!(shadow.opacity, SHADOW_OPACITY);
    }

    #[test]
    fn test_shadow_drops_stale_updates() {
        let mut shadow = ShadowAvatar::new(Vec2::new(260.0, 350.0));
        shadow.apply(&update(5, 300.0, None));
        assert_eq!(shadow.apply(&update(3, 100.0, None)), ApplyOutcome::Stale);
        assert_eq!(shadow.apply(&update(5, 100.0, None)), ApplyOutcome::Stale);
        assert_eq!(shadow.position.y, 300.0);
        assert_eq!(shadow.last_tick(), Some(5));
    }

    #[test]
    fn test_shadow_terminates_once() {
        let mut shadow = ShadowAvatar::new(Vec2::new(260.0, 350.0));
        assert_eq!(
            shadow.apply(&update(1, 300.0, Some(PeerEvent::HitPipe))),
            ApplyOutcome::Terminated
        );
        assert_eq!(
            shadow.apply(&update(2, 300.0, Some(PeerEvent::GameOver))),
            ApplyOutcome::Applied
        );
        assert!(shadow.is_terminated());
        assert!(!shadow.mark_terminated());
    }

    #[test]
    fn test_link_roundtrip() {
        let metrics = Arc::new(Metrics::new());
        let (a, b) = loopback_pair(16);
        let id_a = Uuid::new_v4();
        let mut link_a = PeerLink::new(id_a, Box::new(a.channel), a.inbound, metrics.clone());
        let mut link_b = PeerLink::new(Uuid::new_v4(), Box::new(b.channel), b.inbound, metrics.clone());

        let avatar = Avatar::new(Vec2::new(160.0, 333.0));
        assert!(link_a.broadcast(&avatar, 2, Some(PeerEvent::Flap)));
        assert!(link_a.broadcast(&avatar, 2, None));

        let events = link_b.drain();
        assert_eq!(events.len(), 2);
        match &events[0] {
            LinkEvent::Update(u) => {
                assert_eq!(u.player_id, id_a);
                assert_eq!(u.tick, 1);
                assert_eq!(u.event, Some(PeerEvent::Flap));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(metrics.snapshot().messages_sent, 2);
        assert_eq!(metrics.snapshot().messages_received, 2);
    }

    #[test]
    fn test_link_drops_malformed_payload() {
        let metrics = Arc::new(Metrics::new());
        let (a, b) = loopback_pair(16);
        a.channel.send(&[0xFF, 0x01]).unwrap();
        let mut link_b = PeerLink::new(Uuid::new_v4(), Box::new(b.channel), b.inbound, metrics.clone());
        assert!(link_b.drain().is_empty());
        assert_eq!(metrics.snapshot().decode_failures, 1);
    }

    #[test]
    fn test_link_reports_disconnect() {
        let metrics = Arc::new(Metrics::new());
        let (a, b) = loopback_pair(16);
        let link_a = PeerLink::new(Uuid::new_v4(), Box::new(a.channel), a.inbound, metrics.clone());
        let mut link_b = PeerLink::new(Uuid::new_v4(), Box::new(b.channel), b.inbound, metrics);
        link_a.close();
        assert_eq!(link_b.drain(), vec![LinkEvent::Disconnected]);
        assert!(!link_b.is_connected());
    }

    #[test]
    fn test_broadcast_after_disconnect_is_counted() {
        let metrics = Arc::new(Metrics::new());
        let (a, _b) = loopback_pair(16);
        let mut link = PeerLink::new(Uuid::new_v4(), Box::new(a.channel), a.inbound, metrics.clone());
        link.close();
        assert!(!link.broadcast(&Avatar::new(Vec2::ZERO), 0, None));
        assert_eq!(metrics.snapshot().send_failures, 1);
    }

    #[test]
    fn test_disconnect_reported_once_without_notice() {
        let metrics = Arc::new(Metrics::new());
        let (a, b) = loopback_pair(1);
        a.channel.send(b"x").unwrap();
        // Queue is full, so the notice is lost
        a.channel.disconnect();

        let mut link_b = PeerLink::new(Uuid::new_v4(), Box::new(b.channel), b.inbound, metrics);
        assert_eq!(link_b.drain(), vec![LinkEvent::Disconnected]);
        assert!(link_b.drain().is_empty());
    }

    #[test]
    fn test_queued_notice_and_flag_report_once() {
        let metrics = Arc::new(Metrics::new());
        let (a, b) = loopback_pair(16);
        let mut link_b = PeerLink::new(Uuid::new_v4(), Box::new(b.channel), b.inbound, metrics);
        a.channel.disconnect();
        assert_eq!(link_b.drain(), vec![LinkEvent::Disconnected]);
        assert!(link_b.drain().is_empty());
    }

    #[test]
    fn test_dropping_link_hangs_up() {
        let metrics = Arc::new(Metrics::new());
        let (a, b) = loopback_pair(16);
        let link_a = PeerLink::new(Uuid::new_v4(), Box::new(a.channel), a.inbound, metrics.clone());
        let mut link_b = PeerLink::new(Uuid::new_v4(), Box::new(b.channel), b.inbound, metrics);
        drop(link_a);
        assert_eq!(link_b.drain(), vec![LinkEvent::Disconnected]);
    }

    #[test]
    fn test_send_failure_state_resets_on_success() {
        let metrics = Arc::new(Metrics::new());
        let (a, b) = loopback_pair(1);
        let mut link_a = PeerLink::new(Uuid::new_v4(), Box::new(a.channel), a.inbound, metrics.clone());
        let avatar = Avatar::new(Vec2::ZERO);

        assert!(link_a.broadcast(&avatar, 0, None));
        assert!(!link_a.broadcast(&avatar, 0, None));
        assert!(!link_a.broadcast(&avatar, 0, None));
        assert!(link_a.is_send_failing());
        assert_eq!(metrics.snapshot().send_failures, 2);

        b.inbound.drain();
        assert!(link_a.broadcast(&avatar, 0, None));
        assert!(!link_a.is_send_failing());
    }
}
