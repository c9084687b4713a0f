//! Two peers over the in-process loopback link

use std::sync::atomic::Ordering;
use std::sync::Arc;

use floppy_duck_core::config::GameConfig;
use floppy_duck_core::game::constants::physics::DT;
use floppy_duck_core::game::flow::{GameFlow, GameState};
use floppy_duck_core::game::session::{MatchOutcome, SessionMode};
use floppy_duck_core::game::state::Avatar;
use floppy_duck_core::game::ui::Button;
use floppy_duck_core::metrics::Metrics;
use floppy_duck_core::net::channel::{loopback_pair, ConnectionState, Inbound, LoopbackEnd, PeerChannel};
use floppy_duck_core::net::matchmaking::MatchState;
use floppy_duck_core::net::protocol::{decode_update, encode, GameUpdate, PeerEvent};
use floppy_duck_core::net::sync::PeerLink;
use floppy_duck_core::runner::{self, Autopilot};
use floppy_duck_core::services::Services;
use floppy_duck_core::util::vec2::Vec2;
use uuid::Uuid;

fn seeded() -> GameConfig {
    GameConfig {
        rng_seed: Some(21),
        ..GameConfig::default()
    }
}

/// A flow in head-to-head mode whose peer is driven by hand
fn paired_flow(metrics: Arc<Metrics>) -> (GameFlow, LoopbackEnd, Uuid) {
    paired_flow_with(1024, metrics)
}

fn paired_flow_with(capacity: usize, metrics: Arc<Metrics>) -> (GameFlow, LoopbackEnd, Uuid) {
    let (local, remote) = loopback_pair(capacity);
    let mut flow = GameFlow::new(seeded(), Services::headless(), metrics.clone());
    assert!(runner::tap(&mut flow, Button::Matchmaking));
    assert_eq!(flow.state(), GameState::Matchmaking);

    let opponent = Uuid::new_v4();
    let link = PeerLink::new(flow.local_id(), Box::new(local.channel), local.inbound, metrics);
    assert!(flow.on_match_found(opponent, link));
    assert_eq!(flow.session().map(|s| s.mode()), Some(SessionMode::HeadToHead));
    (flow, remote, opponent)
}

/// Let the local duck fall until it hits the ground
fn crash_local(flow: &mut GameFlow) {
    for _ in 0..600 {
        if flow.session().is_some_and(|s| !s.avatar().alive) {
            return;
        }
        flow.update(DT);
    }
    panic!("avatar never terminated");
}

/// Two flows matched against each other over queues of `capacity`
fn matched_flows(capacity: usize, metrics: Arc<Metrics>) -> (GameFlow, GameFlow) {
    let (end_a, end_b) = loopback_pair(capacity);
    let mut a = GameFlow::new(seeded(), Services::headless(), metrics.clone());
    let mut b = GameFlow::new(seeded(), Services::headless(), metrics.clone());
    assert!(runner::tap(&mut a, Button::Matchmaking));
    assert!(runner::tap(&mut b, Button::Matchmaking));

    let (id_a, id_b) = (a.local_id(), b.local_id());
    let link_a = PeerLink::new(id_a, Box::new(end_a.channel), end_a.inbound, metrics.clone());
    let link_b = PeerLink::new(id_b, Box::new(end_b.channel), end_b.inbound, metrics);
    assert!(a.on_match_found(id_b, link_a));
    assert!(b.on_match_found(id_a, link_b));
    (a, b)
}

fn updates_from(remote: &LoopbackEnd) -> Vec<GameUpdate> {
    remote
        .inbound
        .drain()
        .into_iter()
        .filter_map(|item| match item {
            Inbound::Payload(bytes) => decode_update(&bytes).ok(),
            Inbound::ConnectionChanged(_) => None,
        })
        .collect()
}

fn send(remote: &LoopbackEnd, update: &GameUpdate) {
    let payload = encode(update).unwrap();
    remote.channel.send(&payload).unwrap();
}

fn remote_update(id: Uuid, tick: u64, score: u32, event: Option<PeerEvent>) -> GameUpdate {
    let avatar = Avatar::new(Vec2::new(160.0, 320.0));
    GameUpdate::from_avatar(id, &avatar, score, tick, event)
}

#[tokio::test]
async fn test_loopback_match_resolves_both_sides() {
    let metrics = Arc::new(Metrics::new());
    let pilots = [Autopilot::default(), Autopilot::new(240)];

    let [a, b] = runner::run_head_to_head(seeded(), metrics.clone(), pilots)
        .await
        .unwrap();
    let (a, b) = (a.unwrap(), b.unwrap());

    // Each side saw the other's final score
    assert_eq!(a.remote_score, Some(b.score));
    assert_eq!(b.remote_score, Some(a.score));
    assert!(matches!(
        (a.outcome, b.outcome),
        (MatchOutcome::Won, MatchOutcome::Lost)
            | (MatchOutcome::Lost, MatchOutcome::Won)
            | (MatchOutcome::Draw, MatchOutcome::Draw)
    ));

    assert_eq!(metrics.sessions_started.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.sessions_ended.load(Ordering::Relaxed), 2);
    assert!(metrics.messages_sent.load(Ordering::Relaxed) > 0);
    assert_eq!(metrics.decode_failures.load(Ordering::Relaxed), 0);
}

#[test]
fn test_session_waits_for_remote_termination() {
    let (mut flow, remote, opponent) = paired_flow(Arc::new(Metrics::new()));
    crash_local(&mut flow);

    for _ in 0..30 {
        flow.update(DT);
    }
    assert_eq!(flow.state(), GameState::Playing);
    assert!(!flow.session().unwrap().is_ended());

    send(&remote, &remote_update(opponent, 1, 3, Some(PeerEvent::HitPipe)));
    flow.update(DT);

    assert_eq!(flow.state(), GameState::GameOver);
    let summary = flow.last_summary().copied().unwrap();
    assert_eq!(summary.remote_score, Some(3));
    assert_eq!(summary.outcome, MatchOutcome::Lost);
}

#[test]
fn test_local_updates_reach_the_peer() {
    let (mut flow, remote, _) = paired_flow(Arc::new(Metrics::new()));
    let local_id = flow.local_id();
    flow.flap();
    crash_local(&mut flow);

    let updates = updates_from(&remote);

    assert!(!updates.is_empty());
    assert!(updates.iter().all(|u| u.player_id == local_id));
    assert!(updates.windows(2).all(|w| w[0].tick < w[1].tick));
    assert_eq!(updates[0].event, Some(PeerEvent::Flap));
    assert!(updates.iter().any(|u| u.event == Some(PeerEvent::HitPipe)));

    let avatar = *flow.session().unwrap().avatar();
    let last = updates.last().unwrap();
    assert_eq!(last.position, avatar.position);
    assert_eq!(last.rotation, avatar.rotation);
}

#[test]
fn test_disconnect_counts_as_remote_termination() {
    let (mut flow, remote, _) = paired_flow(Arc::new(Metrics::new()));
    crash_local(&mut flow);
    assert_eq!(flow.state(), GameState::Playing);

    remote.channel.disconnect();
    flow.update(DT);

    assert_eq!(flow.state(), GameState::GameOver);
    assert_eq!(flow.matchmaking().state(), MatchState::Disconnected);
}

#[test]
fn test_stale_updates_are_dropped() {
    let metrics = Arc::new(Metrics::new());
    let (mut flow, remote, opponent) = paired_flow(metrics.clone());

    send(&remote, &remote_update(opponent, 5, 2, None));
    send(&remote, &remote_update(opponent, 3, 9, None));
    flow.update(DT);

    let shadow = flow.session().unwrap().shadow().unwrap();
    assert_eq!(shadow.score, 2);
    assert_eq!(shadow.last_tick(), Some(5));
    assert_eq!(metrics.stale_updates.load(Ordering::Relaxed), 1);
}

#[test]
fn test_malformed_payload_is_ignored() {
    let metrics = Arc::new(Metrics::new());
    let (mut flow, remote, opponent) = paired_flow(metrics.clone());

    remote.channel.send(&[0xff, 0x01]).unwrap();
    send(&remote, &remote_update(opponent, 1, 4, None));
    flow.update(DT);

    assert_eq!(flow.state(), GameState::Playing);
    assert_eq!(flow.session().unwrap().shadow().unwrap().score, 4);
    assert_eq!(metrics.decode_failures.load(Ordering::Relaxed), 1);
}

#[test]
fn test_lost_crash_update_does_not_strand_the_peer() {
    let metrics = Arc::new(Metrics::new());
    let (mut a, mut b) = matched_flows(4, metrics.clone());

    // B stalls while A crashes, so A's crash update never fits in B's queue
    crash_local(&mut a);
    for _ in 0..30 {
        a.update(DT);
    }
    assert!(metrics.send_failures.load(Ordering::Relaxed) > 0);
    assert_eq!(a.state(), GameState::Playing);

    for _ in 0..600 {
        a.update(DT);
        b.update(DT);
        if a.state() == GameState::GameOver && b.state() == GameState::GameOver {
            break;
        }
    }
    assert_eq!(a.state(), GameState::GameOver);
    assert_eq!(b.state(), GameState::GameOver);
    assert!(b.session().unwrap().shadow().unwrap().is_terminated());
}

#[test]
fn test_game_over_is_sent_until_the_link_drops() {
    let (mut flow, remote, opponent) = paired_flow(Arc::new(Metrics::new()));
    send(&remote, &remote_update(opponent, 1, 0, Some(PeerEvent::HitPipe)));
    crash_local(&mut flow);
    assert_eq!(flow.state(), GameState::GameOver);

    let updates = updates_from(&remote);
    assert_eq!(updates.last().and_then(|u| u.event), Some(PeerEvent::GameOver));

    flow.update(DT);
    flow.update(DT);
    let repeats = updates_from(&remote);
    assert_eq!(repeats.len(), 2);
    assert!(repeats.iter().all(|u| u.event == Some(PeerEvent::GameOver)));
}

#[test]
fn test_leaving_tells_the_peer_before_hanging_up() {
    let (mut flow, remote, _) = paired_flow(Arc::new(Metrics::new()));
    flow.update(DT);
    remote.inbound.drain();

    flow.show_main_menu();
    assert_eq!(flow.state(), GameState::MainMenu);

    let items = remote.inbound.drain();
    assert_eq!(items.len(), 2);
    match &items[0] {
        Inbound::Payload(bytes) => {
            let update = decode_update(bytes).unwrap();
            assert_eq!(update.event, Some(PeerEvent::GameOver));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        items[1],
        Inbound::ConnectionChanged(ConnectionState::Disconnected)
    );
}

#[test]
fn test_disconnect_seen_when_notice_is_dropped() {
    let (mut flow, remote, opponent) = paired_flow_with(2, Arc::new(Metrics::new()));
    crash_local(&mut flow);

    // Fill the local queue so the hang-up notice has nowhere to go
    send(&remote, &remote_update(opponent, 1, 0, None));
    send(&remote, &remote_update(opponent, 2, 0, None));
    remote.channel.disconnect();

    flow.update(DT);
    assert_eq!(flow.state(), GameState::GameOver);
    assert_eq!(flow.matchmaking().state(), MatchState::Disconnected);
}
