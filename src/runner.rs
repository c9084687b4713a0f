//! Headless drivers used by the binary and the integration tests
//!
//! An [`Autopilot`] stands in for the player: it taps whenever the avatar
//! sinks below the next gap, and stops helping after a fixed number of
//! ticks so every session eventually ends.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::game::constants::net::INBOUND_QUEUE_CAPACITY;
use crate::game::flow::{GameFlow, GameState};
use crate::game::session::{MatchSession, SessionSummary};
use crate::game::ui::Button;
use crate::metrics::Metrics;
use crate::net::channel::loopback_pair;
use crate::net::sync::PeerLink;
use crate::services::Services;

/// How far below the gap center the avatar may sink before a tap
const FLAP_MARGIN: f32 = 48.0;

#[derive(Debug, Clone, Copy)]
pub struct Autopilot {
    /// Ticks after which the pilot stops flapping
    pub give_up_after: u64,
}

impl Autopilot {
    pub fn new(give_up_after: u64) -> Self {
        Self { give_up_after }
    }

    pub fn wants_flap(&self, session: &MatchSession) -> bool {
        let avatar = session.avatar();
        if !avatar.alive || session.ticks() >= self.give_up_after {
            return false;
        }

        let left_edge = avatar.position.x - avatar.radius;
        let target = session
            .obstacles()
            .iter()
            .filter(|p| p.x + p.width > left_edge)
            .min_by(|a, b| a.x.total_cmp(&b.x))
            .map(|p| p.gap_center)
            .unwrap_or(session.field().height * 0.5);

        avatar.velocity.y <= 0.0 && avatar.position.y < target - FLAP_MARGIN
    }
}

impl Default for Autopilot {
    fn default() -> Self {
        // Twenty seconds at 60 Hz
        Self::new(1200)
    }
}

/// Wall-clock pacing, or none at all
pub struct Pacer {
    interval: Option<Interval>,
}

impl Pacer {
    pub fn new(realtime: bool, dt: f32) -> Self {
        let interval = realtime.then(|| {
            let mut interval = interval(Duration::from_secs_f32(dt));
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            interval
        });
        Self { interval }
    }

    pub async fn wait(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => tokio::task::yield_now().await,
        }
    }
}

/// Tap the center of `button` on the current screen
pub fn tap(flow: &mut GameFlow, button: Button) -> bool {
    let Some(point) = flow.layout().region(button).map(|r| r.rect.center()) else {
        return false;
    };
    flow.handle_touch(point) == Some(button)
}

/// Drive the active session until the flow leaves `Playing`
pub async fn play_session(
    flow: &mut GameFlow,
    pilot: &Autopilot,
    dt: f32,
    pacer: &mut Pacer,
) -> Option<SessionSummary> {
    while flow.state() == GameState::Playing {
        if flow.session().is_some_and(|s| pilot.wants_flap(s)) {
            flow.flap();
        }
        flow.update(dt);
        pacer.wait().await;
    }
    flow.last_summary().copied()
}

/// Let the crash sequence run out so restart input is accepted
pub async fn wait_for_restart(flow: &mut GameFlow, dt: f32, pacer: &mut Pacer) {
    while flow.state() == GameState::GameOver && !flow.can_restart() {
        flow.update(dt);
        pacer.wait().await;
    }
}

/// Play `sessions` solo rounds back to back
pub async fn run_solo(
    config: GameConfig,
    services: Services,
    metrics: Arc<Metrics>,
    sessions: u32,
    pilot: Autopilot,
) -> Vec<SessionSummary> {
    let dt = config.dt();
    let mut pacer = Pacer::new(config.realtime, dt);
    let mut flow = GameFlow::new(config, services, metrics);
    let mut summaries = Vec::with_capacity(sessions as usize);

    for round in 0..sessions {
        let button = if round == 0 { Button::Start } else { Button::PlayAgain };
        if !tap(&mut flow, button) {
            debug!("{:?} not available in {:?}", button, flow.state());
            break;
        }
        if let Some(summary) = play_session(&mut flow, &pilot, dt, &mut pacer).await {
            info!(
                "Solo round {}: score {}, distance {:.0} m, {} flaps",
                round + 1,
                summary.score,
                summary.stats.distance,
                summary.stats.flaps
            );
            summaries.push(summary);
        }
        wait_for_restart(&mut flow, dt, &mut pacer).await;
    }

    let profile = flow.profile();
    info!(
        "Profile: best {}, {} flights, avg {:.1} m / {:.1} flaps per flight",
        profile.high_score, profile.total_flights, profile.average_distance, profile.average_flaps
    );
    summaries
}

/// Two peers over an in-process link, each on its own task
pub async fn run_head_to_head(
    config: GameConfig,
    metrics: Arc<Metrics>,
    pilots: [Autopilot; 2],
) -> Result<[Option<SessionSummary>; 2], JoinError> {
    // Both peers race the same course
    let config = GameConfig {
        rng_seed: Some(config.rng_seed.unwrap_or_else(rand::random)),
        ..config
    };
    let dt = config.dt();
    let (end_a, end_b) = loopback_pair(INBOUND_QUEUE_CAPACITY);

    let mut flow_a = GameFlow::new(config.clone(), Services::headless(), metrics.clone());
    let mut flow_b = GameFlow::new(config.clone(), Services::headless(), metrics.clone());
    let (id_a, id_b) = (flow_a.local_id(), flow_b.local_id());

    tap(&mut flow_a, Button::Matchmaking);
    tap(&mut flow_b, Button::Matchmaking);
    flow_a.on_match_found(
        id_b,
        PeerLink::new(id_a, Box::new(end_a.channel), end_a.inbound, metrics.clone()),
    );
    flow_b.on_match_found(
        id_a,
        PeerLink::new(id_b, Box::new(end_b.channel), end_b.inbound, metrics.clone()),
    );

    let realtime = config.realtime;
    let spawn_peer = move |mut flow: GameFlow, pilot: Autopilot| {
        tokio::spawn(async move {
            let mut pacer = Pacer::new(realtime, dt);
            play_session(&mut flow, &pilot, dt, &mut pacer).await
        })
    };

    let task_a = spawn_peer(flow_a, pilots[0]);
    let task_b = spawn_peer(flow_b, pilots[1]);
    let (a, b) = tokio::join!(task_a, task_b);
    Ok([a?, b?])
}

#[cfg(feature = "lobby")]
pub use tournament::run_tournament;

#[cfg(feature = "lobby")]
mod tournament {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tracing::info;
    use uuid::Uuid;

    use super::*;
    use crate::game::state::PlayerId;
    use crate::lobby::tournament::{Bracket, TournamentError, TournamentManager, TournamentState};

    /// Every bracket plays solo rounds; the bracket scores decide who advances
    pub async fn run_tournament(
        config: GameConfig,
        metrics: Arc<Metrics>,
        players: usize,
    ) -> Result<Option<PlayerId>, TournamentError> {
        let ids: Vec<PlayerId> = (0..players).map(|_| Uuid::new_v4()).collect();
        let Some(host) = ids.first().copied() else {
            return Ok(None);
        };
        let mut rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut manager = TournamentManager::new(host);
        let id = manager.create_tournament("Pond Cup", None, chrono::Duration::hours(1));
        for player in &ids[1..] {
            manager.register_player(id, *player)?;
        }
        manager.start_tournament(&mut rng)?;

        // Skill varies per entrant so rounds are not all ties
        let skill = |player: &PlayerId| 300 + u64::from(player.as_bytes()[0]) * 4;

        loop {
            let Some(tournament) = manager.current() else {
                return Ok(None);
            };
            if tournament.state == TournamentState::Complete {
                return Ok(tournament.winners.first().copied());
            }
            let round = tournament.current_round;
            let entrants: Vec<PlayerId> = tournament
                .brackets
                .iter()
                .flat_map(|b| match *b {
                    Bracket::Pair(a, b) => vec![a, b],
                    Bracket::Bye(_) => Vec::new(),
                })
                .collect();

            for player in entrants {
                let summaries = run_solo(
                    config.clone(),
                    Services::headless(),
                    metrics.clone(),
                    1,
                    Autopilot::new(skill(&player)),
                )
                .await;
                let score = summaries.first().map_or(0, |s| s.score);
                manager.submit_score(id, player, score)?;
            }

            let state = manager.advance_tournament(&mut rng)?;
            info!("Tournament round {} resolved ({:?})", round + 1, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::physics::DT;
    use crate::game::session::{MatchOutcome, SessionSetup};

    #[test]
    fn test_autopilot_waits_for_the_avatar_to_sink() {
        let mut session = MatchSession::new(SessionSetup {
            seed: 5,
            ..SessionSetup::default()
        });
        let pilot = Autopilot::default();
        assert!(!pilot.wants_flap(&session));

        let mut asked = false;
        for _ in 0..120 {
            session.tick(DT);
            if pilot.wants_flap(&session) {
                asked = true;
                break;
            }
        }
        assert!(asked);
        assert!(session.avatar().velocity.y <= 0.0);
        assert!(!Autopilot::new(0).wants_flap(&session));
    }

    #[test]
    fn test_tap_ignores_buttons_off_screen() {
        let mut flow = GameFlow::new(GameConfig::default(), Services::headless(), Arc::new(Metrics::new()));
        assert!(!tap(&mut flow, Button::PlayAgain));
        assert_eq!(flow.state(), GameState::MainMenu);
        assert!(tap(&mut flow, Button::Profile));
        assert_eq!(flow.state(), GameState::Profile);
    }

    #[test]
    fn test_play_session_runs_to_game_over() {
        let mut flow = GameFlow::new(GameConfig::default(), Services::headless(), Arc::new(Metrics::new()));
        assert!(tap(&mut flow, Button::Start));

        let mut pacer = Pacer::new(false, DT);
        let summary = tokio_test::block_on(play_session(&mut flow, &Autopilot::new(0), DT, &mut pacer));

        let summary = summary.unwrap();
        assert_eq!(summary.outcome, MatchOutcome::Solo);
        assert_eq!(summary.score, 0);
        assert_eq!(flow.state(), GameState::GameOver);
    }
}
