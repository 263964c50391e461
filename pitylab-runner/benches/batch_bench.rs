//! Criterion benchmarks for batch reduction.
//!
//! Run with: `cargo bench -p pitylab-runner`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pitylab_core::{UpgradeConfig, UpgradeSpec};
use pitylab_runner::{histogram, run_batch, BatchRequest, Summary};

fn config() -> UpgradeConfig {
    UpgradeConfig::new(UpgradeSpec {
        stage_count: 5,
        stage_probabilities: vec![0.9, 0.8, 0.6, 0.4, 0.3],
        final_probability: 0.1,
        cost_per_attempt: 1_000.0,
        stage_pity_threshold: 6,
        final_pity_threshold: 12,
        reset_all_stage_pity_on_any_failure: false,
    })
    .unwrap()
}

/// Synthetic attempt counts for the reduction benchmarks.
fn generate_attempts(count: usize) -> Vec<u64> {
    (0..count).map(|i| 5 + (i as u64 * 7919) % 400).collect()
}

fn bench_run_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_batch");
    group.sample_size(20);
    let config = config();

    for trials in [100, 1_000, 10_000].iter() {
        let request = BatchRequest {
            trials: *trials,
            ..BatchRequest::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(trials), trials, |b, _| {
            b.iter(|| {
                let _ = black_box(run_batch(&config, &request));
            });
        });
    }

    group.finish();
}

fn bench_reduction(c: &mut Criterion) {
    let attempts = generate_attempts(100_000);
    let as_f64: Vec<f64> = attempts.iter().map(|&a| a as f64).collect();

    c.bench_function("summary_100k", |b| {
        b.iter(|| black_box(Summary::from_samples(black_box(&as_f64))));
    });
    c.bench_function("histogram_100k", |b| {
        b.iter(|| black_box(histogram(black_box(&attempts), 5)));
    });
}

criterion_group!(benches, bench_run_batch, bench_reduction);
criterion_main!(benches);
