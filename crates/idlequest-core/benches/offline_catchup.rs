use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use idlequest_core::config::GameConfig;
use idlequest_core::engine::IdleEngine;
use idlequest_core::state::Snapshot;
use idlequest_core::systems::OfflineCatchup;

const HOUR_MS: u64 = 3_600_000;

fn running_snapshot(action: &str) -> Snapshot {
    let mut engine = IdleEngine::seeded(GameConfig::starter(), 0, 42);
    let _ = engine.start(action);
    engine.tick(1.0);
    engine.snapshot(1_000)
}

fn bench_catchup(c: &mut Criterion) {
    let catchup = OfflineCatchup::new(GameConfig::starter().offline);
    let mut group = c.benchmark_group("offline_catchup");
    for hours in [1u64, 8] {
        for action in ["beg", "rest"] {
            let snapshot = running_snapshot(action);
            group.bench_with_input(BenchmarkId::new(action, hours), &hours, |b, &hours| {
                b.iter(|| catchup.run(black_box(&snapshot), hours * HOUR_MS))
            });
        }
    }
    group.finish();
}

/// For comparison: the same hour ticked at the live cadence.
fn bench_live_hour(c: &mut Criterion) {
    c.bench_function("live_hour_100ms_ticks", |b| {
        b.iter_batched(
            || {
                let mut engine = IdleEngine::seeded(GameConfig::starter(), 0, 42);
                let _ = engine.start("beg");
                engine
            },
            |mut engine| {
                for _ in 0..36_000 {
                    engine.tick(0.1);
                    engine.drain_events();
                }
                engine
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(catchup_benches, bench_catchup, bench_live_hour);
criterion_main!(catchup_benches);
