//! Criterion micro-benchmarks for event queue insert/pop and unpaced dispatch.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use cadence_core::SimTime;
use cadence_engine::{EventQueue, Scheduler, SchedulerConfig};

const EVENTS: usize = 10_000;

/// Deterministic event times in `[0, 1000)` with plenty of ties.
fn event_times(seed: u64) -> Vec<SimTime> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..EVENTS)
        .map(|_| SimTime::new(rng.random_range(0..1000u32) as f64 * 0.5).unwrap())
        .collect()
}

fn bench_insert_pop(c: &mut Criterion) {
    let times = event_times(42);
    c.bench_function("queue_insert_then_drain_10k", |b| {
        b.iter(|| {
            let mut q = EventQueue::new();
            for (i, t) in times.iter().enumerate() {
                q.insert(*t, i);
            }
            let mut sum = 0usize;
            while let Ok(e) = q.pop_min() {
                sum = sum.wrapping_add(e.payload);
            }
            black_box(sum)
        })
    });
}

fn bench_unpaced_dispatch(c: &mut Criterion) {
    let times = event_times(7);
    c.bench_function("scheduler_dispatch_10k_unpaced", |b| {
        b.iter_batched(
            || {
                let mut s = Scheduler::new(SchedulerConfig::with_rate(1e9)).unwrap();
                for t in &times {
                    s.schedule(*t, |_| Ok(())).unwrap();
                }
                s
            },
            |mut s| black_box(s.run(SimTime::new(1000.0).unwrap()).unwrap()),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_insert_pop, bench_unpaced_dispatch);
criterion_main!(benches);
