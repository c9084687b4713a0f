//! Simulation and wire-format benchmarks
//!
//! Run with: cargo bench --bench simulation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use floppy_duck_core::game::constants::physics::DT;
use floppy_duck_core::game::session::{MatchSession, SessionMode, SessionSetup};
use floppy_duck_core::game::state::{Avatar, ObstaclePair, PlayField};
use floppy_duck_core::game::systems::collision;
use floppy_duck_core::net::protocol::{decode_update, encode, GameUpdate, PeerEvent};
use rand::Rng;
use uuid::Uuid;

/// A field crowded with `count` pairs at random offsets
fn crowded_obstacles(field: &PlayField, count: usize) -> Vec<ObstaclePair> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let x = rng.gen_range(0.0..field.width);
            let gap = rng.gen_range(200.0..field.height - 200.0);
            ObstaclePair::new(i as u64, x, gap, 180.0, 150.0)
        })
        .collect()
}

fn bench_session_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_tick");

    for mode in [SessionMode::Solo, SessionMode::HeadToHead] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{:?}", mode)), &mode, |b, &mode| {
            let mut session = MatchSession::new(SessionSetup {
                seed: 42,
                mode,
                ..SessionSetup::default()
            });
            b.iter(|| {
                // Keep the avatar airborne so the world keeps moving
                if session.ticks() % 20 == 0 {
                    session.flap();
                }
                if session.avatar().alive {
                    black_box(session.tick(DT));
                } else {
                    session = MatchSession::new(SessionSetup {
                        seed: 42,
                        mode,
                        ..SessionSetup::default()
                    });
                }
            });
        });
    }

    group.finish();
}

fn bench_detect_contacts(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_contacts");
    let field = PlayField::default();
    let avatar = Avatar::new(field.avatar_spawn());

    for count in [4, 16, 64, 256] {
        let obstacles = crowded_obstacles(&field, count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &obstacles, |b, obstacles| {
            b.iter(|| black_box(collision::detect_contacts(&avatar, obstacles, &field)));
        });
    }

    group.finish();
}

fn bench_protocol(c: &mut Criterion) {
    let mut group = c.benchmark_group("protocol");
    let avatar = Avatar::new(PlayField::default().avatar_spawn());
    let update = GameUpdate::from_avatar(Uuid::new_v4(), &avatar, 12, 900, Some(PeerEvent::ScorePoint));
    let bytes = encode(&update).unwrap();
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("encode_update", |b| b.iter(|| encode(black_box(&update))));
    group.bench_function("decode_update", |b| b.iter(|| decode_update(black_box(&bytes))));

    group.finish();
}

criterion_group!(benches, bench_session_tick, bench_detect_contacts, bench_protocol);
criterion_main!(benches);
