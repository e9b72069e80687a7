//! Tick-rate benchmarks for the room simulation.
//!
//! A room must finish a tick well inside the 16.7 ms budget at full
//! occupancy. Run with: cargo bench --bench tick_rate

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use rumble_arena_server::game::constants::timing;
use rumble_arena_server::game::events::NullSink;
use rumble_arena_server::game::match_state::MatchConfig;
use rumble_arena_server::game::player::InputState;
use rumble_arena_server::game::simulation::RoomCore;
use rumble_arena_server::game::weapons::WeaponCatalog;
use rumble_arena_server::util::clock::{Clock, ManualClock};

/// A room at the given occupancy, every player holding movement input.
fn create_room(players: usize) -> (Arc<ManualClock>, RoomCore) {
    let clock = Arc::new(ManualClock::new());
    let core = RoomCore::new(
        Uuid::new_v4(),
        clock.clone(),
        Arc::new(WeaponCatalog::default()),
        Arc::new(NullSink),
        MatchConfig::default(),
        0xB0A7,
    );
    for i in 0..players {
        let id = format!("player-{i}");
        core.add_player(id.clone());
        core.update_player_input(
            &id,
            InputState {
                right: i % 2 == 0,
                down: i % 2 == 1,
                sprint: i % 3 == 0,
                aim_angle: i as f64,
                ..Default::default()
            },
            1,
        );
    }
    core.match_state().start(clock.now());
    (clock, core)
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.sample_size(100);

    for count in [2usize, 4, 8] {
        let (clock, core) = create_room(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("players", count), &count, |b, _| {
            b.iter(|| {
                clock.advance(Duration::from_secs_f64(timing::DT));
                core.tick();
                black_box(&core);
            });
        });
    }
    group.finish();
}

fn bench_tick_with_fire(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_with_fire");
    group.sample_size(100);

    for count in [2usize, 8] {
        let (clock, core) = create_room(count);
        group.bench_with_input(BenchmarkId::new("players", count), &count, |b, _| {
            b.iter(|| {
                clock.advance(Duration::from_secs_f64(timing::DT));
                // Every player pulls the trigger every tick; the cooldown
                // gate makes most of these cheap rejections, as in a real
                // room full of mashed buttons.
                for i in 0..count {
                    black_box(core.player_shoot(&format!("player-{i}"), i as f64, 0));
                }
                core.tick();
            });
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for count in [2usize, 8] {
        let (_clock, core) = create_room(count);
        group.bench_with_input(BenchmarkId::new("players", count), &count, |b, _| {
            b.iter(|| black_box(core.snapshot_players()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick, bench_tick_with_fire, bench_snapshot);
criterion_main!(benches);
