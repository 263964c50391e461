//! Criterion benchmarks for the simulator hot loop.
//!
//! Run with: `cargo bench -p pitylab-core`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pitylab_core::{full_run_worst_case, Lcg, Simulator, UpgradeConfig, UpgradeSpec};

fn make_config(stage_count: usize, reset: bool) -> UpgradeConfig {
    UpgradeConfig::new(UpgradeSpec {
        stage_count: stage_count as i64,
        stage_probabilities: (0..stage_count).map(|i| 0.9 - i as f64 * 0.1).collect(),
        final_probability: 0.2,
        cost_per_attempt: 100.0,
        stage_pity_threshold: 5,
        final_pity_threshold: 10,
        reset_all_stage_pity_on_any_failure: reset,
    })
    .unwrap()
}

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_run");

    for stages in [1, 3, 5].iter() {
        let config = make_config(*stages, false);
        group.bench_with_input(BenchmarkId::from_parameter(stages), stages, |b, _| {
            let sim = Simulator::new(&config).unwrap();
            let mut rng = Lcg::new(42);
            b.iter(|| {
                let _ = black_box(sim.full_run(&mut rng));
            });
        });
    }

    group.finish();
}

fn bench_stages_only_with_reset(c: &mut Criterion) {
    let config = make_config(3, true);
    c.bench_function("stages_only_reset", |b| {
        let sim = Simulator::new(&config).unwrap();
        let mut rng = Lcg::new(42);
        b.iter(|| {
            let _ = black_box(sim.stages_only(&mut rng));
        });
    });
}

fn bench_worst_case(c: &mut Criterion) {
    let config = make_config(5, false);
    c.bench_function("full_run_worst_case", |b| {
        b.iter(|| black_box(full_run_worst_case(black_box(&config))));
    });
}

criterion_group!(
    benches,
    bench_full_run,
    bench_stages_only_with_reset,
    bench_worst_case
);
criterion_main!(benches);
