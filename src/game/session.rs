//! One play-through, solo or head-to-head
//!
//! The session owns everything that lives between entering `Playing` and
//! reaching `GameOver`: the local avatar, the obstacle pairs and their
//! spawner, the score, the per-session counters and, in head-to-head, the
//! remote shadow. A solo session ends on the first terminal contact; a
//! head-to-head session ends once both sides have terminated.

use smallvec::SmallVec;
use tracing::{debug, info};
use uuid::Uuid;

use crate::game::constants::field::SHADOW_X_RATIO;
use crate::game::difficulty::SpawnSettings;
use crate::game::state::{Avatar, EntityId, ObstaclePair, PlayField, SessionStats};
use crate::game::systems::collision::{self, ContactEvent, ResolveContext, Resolution, ScorePulse};
use crate::game::systems::physics::{self, PhysicsParams};
use crate::game::systems::spawner::{self, ObstacleSpawner};
use crate::net::protocol::GameUpdate;
use crate::net::sync::{ApplyOutcome, ShadowAvatar};
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Solo,
    HeadToHead,
}

/// Everything needed to start a session
#[derive(Debug, Clone, Copy)]
pub struct SessionSetup {
    pub field: PlayField,
    pub physics: PhysicsParams,
    pub spawn: SpawnSettings,
    /// Moving-gap chance per spawned pair
    pub special_chance: f32,
    pub seed: u64,
    pub mode: SessionMode,
}

impl Default for SessionSetup {
    fn default() -> Self {
        Self {
            field: PlayField::default(),
            physics: PhysicsParams::default(),
            spawn: SpawnSettings::baseline(),
            special_chance: 0.0,
            seed: 0,
            mode: SessionMode::Solo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Solo,
    Won,
    Lost,
    Draw,
}

/// Final numbers of a finished session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub score: u32,
    pub stats: SessionStats,
    pub remote_score: Option<u32>,
    pub outcome: MatchOutcome,
}

/// Something that happened during a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    ObstacleSpawned(EntityId),
    Scored { score: u32, pulse: ScorePulse },
    /// Local avatar hit something; `crash_spin` is the nose-dive rotation
    AvatarTerminated { crash_spin: f32 },
    Ended(SessionSummary),
}

pub type SessionEvents = SmallVec<[SessionEvent; 4]>;

pub struct MatchSession {
    id: Uuid,
    field: PlayField,
    physics: PhysicsParams,
    mode: SessionMode,
    avatar: Avatar,
    obstacles: Vec<ObstaclePair>,
    spawner: ObstacleSpawner,
    score: u32,
    stats: SessionStats,
    shadow: Option<ShadowAvatar>,
    ticks: u64,
    ended: bool,
}

impl MatchSession {
    pub fn new(setup: SessionSetup) -> Self {
        let spawner = ObstacleSpawner::with_seed(setup.spawn, setup.seed)
            .with_special_chance(setup.special_chance);
        let shadow = match setup.mode {
            SessionMode::HeadToHead => Some(ShadowAvatar::new(Vec2::new(
                setup.field.width * SHADOW_X_RATIO,
                setup.field.height * 0.5,
            ))),
            SessionMode::Solo => None,
        };

        let id = Uuid::new_v4();
        debug!("Session {} started ({:?}, gap {})", id, setup.mode, setup.spawn.gap);

        Self {
            id,
            field: setup.field,
            physics: setup.physics,
            mode: setup.mode,
            avatar: Avatar::new(setup.field.avatar_spawn()),
            obstacles: Vec::new(),
            spawner,
            score: 0,
            stats: SessionStats::default(),
            shadow,
            ticks: 0,
            ended: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn field(&self) -> &PlayField {
        &self.field
    }

    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    pub fn obstacles(&self) -> &[ObstaclePair] {
        &self.obstacles
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn shadow(&self) -> Option<&ShadowAvatar> {
        self.shadow.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Apply a flap; false if the avatar can no longer move
    pub fn flap(&mut self) -> bool {
        if self.ended || !physics::flap(&mut self.avatar, &self.physics) {
            return false;
        }
        self.stats.record_flap();
        true
    }

    /// Step the simulation by `dt` seconds
    ///
    /// Once the local avatar is down the world stops moving; in
    /// head-to-head the session keeps waiting for the remote side.
    pub fn tick(&mut self, dt: f32) -> SessionEvents {
        let mut events = SessionEvents::new();
        if self.ended {
            return events;
        }
        self.ticks += 1;

        if self.avatar.alive {
            physics::integrate(&mut self.avatar, &self.physics, dt);
            self.stats.advance(dt);

            for pair in self.spawner.tick(dt, &self.field) {
                events.push(SessionEvent::ObstacleSpawned(pair.id));
                self.obstacles.push(pair);
            }
            spawner::advance_obstacles(&mut self.obstacles, dt);

            let contacts = collision::detect_contacts(&self.avatar, &self.obstacles, &self.field);
            for contact in &contacts {
                events.extend(self.apply_contact(contact, true));
            }
        }

        events
    }

    /// Resolve a single contact, checking whether the session is over
    pub fn apply_contact(&mut self, contact: &ContactEvent, playing: bool) -> SessionEvents {
        let mut events = SessionEvents::new();
        if self.ended {
            return events;
        }

        let resolution = collision::resolve(
            contact,
            ResolveContext {
                playing,
                avatar: &mut self.avatar,
                score: &mut self.score,
                obstacles: &mut self.obstacles,
            },
        );

        match resolution {
            Resolution::Scored { score, pulse } => {
                events.push(SessionEvent::Scored { score, pulse });
            }
            Resolution::Terminal { pair_id } => {
                debug!("Session {} terminal contact (pair {:?})", self.id, pair_id);
                events.push(SessionEvent::AvatarTerminated {
                    crash_spin: physics::crash_spin(&self.avatar),
                });
                events.extend(self.check_end());
            }
            Resolution::Ignored => {}
        }
        events
    }

    /// Mirror a remote update into the shadow
    pub fn apply_remote(&mut self, update: &GameUpdate) -> (ApplyOutcome, Option<SessionEvent>) {
        let Some(shadow) = self.shadow.as_mut() else {
            return (ApplyOutcome::Stale, None);
        };
        let outcome = shadow.apply(update);
        let ended = if outcome == ApplyOutcome::Terminated {
            self.check_end()
        } else {
            None
        };
        (outcome, ended)
    }

    /// The remote peer is gone; count it as terminated
    pub fn remote_disconnected(&mut self) -> Option<SessionEvent> {
        let newly = self.shadow.as_mut().map(|s| s.mark_terminated())?;
        if newly {
            self.check_end()
        } else {
            None
        }
    }

    fn check_end(&mut self) -> Option<SessionEvent> {
        if self.ended || !self.avatar.is_terminated() {
            return None;
        }
        let remote_done = self.shadow.as_ref().map_or(true, |s| s.is_terminated());
        if !remote_done {
            return None;
        }

        self.ended = true;
        let summary = self.summary();
        info!(
            "Session {} ended: score {} ({:?}), distance {:.0}, flaps {}",
            self.id, summary.score, summary.outcome, summary.stats.distance, summary.stats.flaps
        );
        Some(SessionEvent::Ended(summary))
    }

    pub fn summary(&self) -> SessionSummary {
        let remote_score = self.shadow.as_ref().map(|s| s.score);
        let outcome = match remote_score {
            None => MatchOutcome::Solo,
            Some(remote) if self.score > remote => MatchOutcome::Won,
            Some(remote) if self.score < remote => MatchOutcome::Lost,
            Some(_) => MatchOutcome::Draw,
        };
        SessionSummary {
            score: self.score,
            stats: self.stats,
            remote_score,
            outcome,
        }
    }
}
