use smallvec::SmallVec;

use crate::game::constants::{cue, obstacle};
use crate::game::state::{Avatar, EntityId, ObstaclePair, PlayField};

/// Collision category bit flags
pub mod category {
    pub const AVATAR: u32 = 1 << 0;
    pub const WORLD: u32 = 1 << 1;
    pub const OBSTACLE: u32 = 1 << 2;
    pub const SCORE_ZONE: u32 = 1 << 3;
    /// Coin on a reward pair
    pub const REWARD: u32 = 1 << 4;
}

/// A contact that began this tick between two tagged bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub body_a: u32,
    pub body_b: u32,
    /// Obstacle pair involved, if any
    pub pair_id: Option<EntityId>,
}

impl ContactEvent {
    pub fn new(body_a: u32, body_b: u32, pair_id: Option<EntityId>) -> Self {
        Self {
            body_a,
            body_b,
            pair_id,
        }
    }

    pub fn mask(&self) -> u32 {
        self.body_a | self.body_b
    }
}

/// What a contact means for gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    ScorePoint,
    /// Reward coin pickup
    Bonus,
    Terminal,
    Ignored,
}

/// Classify a contact purely by its category pair
pub fn classify(contact: &ContactEvent) -> ContactKind {
    let mask = contact.mask();
    if mask == category::AVATAR | category::SCORE_ZONE {
        ContactKind::ScorePoint
    } else if mask == category::AVATAR | category::REWARD {
        ContactKind::Bonus
    } else if mask == category::AVATAR | category::OBSTACLE
        || mask == category::AVATAR | category::WORLD
    {
        ContactKind::Terminal
    } else {
        ContactKind::Ignored
    }
}

/// Presentation cue for a score increment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorePulse {
    pub scale: f32,
    /// Duration of the scale-up and of the scale-down
    pub half_duration: f32,
}

impl Default for ScorePulse {
    fn default() -> Self {
        Self {
            scale: cue::SCORE_PULSE_SCALE,
            half_duration: cue::SCORE_PULSE_HALF,
        }
    }
}

/// Outcome of resolving one contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Scored { score: u32, pulse: ScorePulse },
    Terminal { pair_id: Option<EntityId> },
    Ignored,
}

/// Mutable state a contact may touch
pub struct ResolveContext<'a> {
    /// Only contacts during active play count
    pub playing: bool,
    pub avatar: &'a mut Avatar,
    pub score: &'a mut u32,
    pub obstacles: &'a mut Vec<ObstaclePair>,
}

/// Apply one contact
///
/// Outside active play, or once the avatar is terminated, every contact is
/// ignored, so a terminal hit can never be counted twice.
pub fn resolve(contact: &ContactEvent, ctx: ResolveContext<'_>) -> Resolution {
    if !ctx.playing || ctx.avatar.is_terminated() {
        return Resolution::Ignored;
    }

    match classify(contact) {
        ContactKind::ScorePoint => {
            let pair = contact
                .pair_id
                .and_then(|id| ctx.obstacles.iter_mut().find(|p| p.id == id));
            match pair {
                Some(pair) if !pair.scored => {
                    pair.scored = true;
                    *ctx.score = ctx.score.saturating_add(1);
                    Resolution::Scored {
                        score: *ctx.score,
                        pulse: ScorePulse::default(),
                    }
                }
                // Zone already passed, or pair gone
                _ => Resolution::Ignored,
            }
        }
        ContactKind::Bonus => {
            let collected = contact
                .pair_id
                .and_then(|id| ctx.obstacles.iter_mut().find(|p| p.id == id))
                .is_some_and(|pair| pair.collect_reward());
            if !collected {
                return Resolution::Ignored;
            }
            *ctx.score = ctx.score.saturating_add(1);
            Resolution::Scored {
                score: *ctx.score,
                pulse: ScorePulse::default(),
            }
        }
        ContactKind::Terminal => {
            let ghost = contact
                .pair_id
                .and_then(|id| ctx.obstacles.iter().find(|p| p.id == id))
                .is_some_and(|p| p.is_ghost());
            if ghost {
                return Resolution::Ignored;
            }
            ctx.avatar.freeze();
            if let Some(id) = contact.pair_id {
                ctx.obstacles.retain(|p| p.id != id);
            }
            Resolution::Terminal {
                pair_id: contact.pair_id,
            }
        }
        ContactKind::Ignored => Resolution::Ignored,
    }
}

/// Geometric contact detection for the local avatar
///
/// Score zones that were already passed are skipped so each zone reports
/// at most once. Ghost halves never block; a reward coin reports until it
/// is collected.
pub fn detect_contacts(
    avatar: &Avatar,
    obstacles: &[ObstaclePair],
    field: &PlayField,
) -> SmallVec<[ContactEvent; 4]> {
    let mut contacts = SmallVec::new();
    if avatar.is_terminated() {
        return contacts;
    }

    let pos = avatar.position;
    let r = avatar.radius;

    if pos.y - r <= field.ground_height || pos.y + r >= field.height {
        contacts.push(ContactEvent::new(category::AVATAR, category::WORLD, None));
    }

    for pair in obstacles {
        // Cheap horizontal reject
        let zone_end = pair.x + pair.width + obstacle::SCORE_ZONE_WIDTH;
        if pos.x + r < pair.x || pos.x - r > zone_end {
            continue;
        }

        if let Some(coin) = pair.reward_center() {
            let reach = r + obstacle::REWARD_RADIUS;
            if pos.distance_sq_to(coin) <= reach * reach {
                contacts.push(ContactEvent::new(
                    category::AVATAR,
                    category::REWARD,
                    Some(pair.id),
                ));
            }
        }

        let blocked = !pair.is_ghost()
            && (pair.lower_rect().intersects_circle(pos, r)
                || pair.upper_rect(field.height).intersects_circle(pos, r));
        if blocked {
            contacts.push(ContactEvent::new(
                category::AVATAR,
                category::OBSTACLE,
                Some(pair.id),
            ));
        } else if !pair.scored && pair.score_zone(field.height).intersects_circle(pos, r) {
            contacts.push(ContactEvent::new(
                category::AVATAR,
                category::SCORE_ZONE,
                Some(pair.id),
            ));
        }
    }

    contacts
}
