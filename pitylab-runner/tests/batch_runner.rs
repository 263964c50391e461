//! Integration tests for the batch runner and parameter sweep.
//!
//! Tests: determinism for a fixed seed, percentile ordering, histogram
//! conservation, probability-zero batches against the worst case,
//! serial vs parallel sweep equality.

use pitylab_core::{Bound, UpgradeConfig, UpgradeSpec};
use pitylab_runner::{
    run_batch, simulate_trials, BatchError, BatchRequest, ParamGrid, ParamSweep,
};

fn base_config() -> UpgradeConfig {
    UpgradeConfig::new(UpgradeSpec {
        stage_count: 4,
        stage_probabilities: vec![0.9, 0.7, 0.5, 0.3],
        final_probability: 0.15,
        cost_per_attempt: 250.0,
        stage_pity_threshold: 4,
        final_pity_threshold: 6,
        reset_all_stage_pity_on_any_failure: false,
    })
    .unwrap()
}

fn request(trials: usize, seed: i64) -> BatchRequest {
    BatchRequest {
        trials,
        seed,
        ..BatchRequest::default()
    }
}

#[test]
fn same_seed_is_bit_identical() {
    let config = base_config();
    let a = simulate_trials(&config, &request(300, 99)).unwrap();
    let b = simulate_trials(&config, &request(300, 99)).unwrap();
    assert_eq!(a, b);

    let ra = run_batch(&config, &request(300, 99)).unwrap();
    let rb = run_batch(&config, &request(300, 99)).unwrap();
    assert_eq!(ra, rb);
}

#[test]
fn different_seeds_differ() {
    let config = base_config();
    let a = simulate_trials(&config, &request(200, 1)).unwrap();
    let b = simulate_trials(&config, &request(200, 2)).unwrap();
    assert_ne!(a.full_run, b.full_run);
}

#[test]
fn percentiles_ordered_and_histograms_conserve_trials() {
    let config = base_config();
    let trials = 2_000;
    let result = run_batch(&config, &request(trials, 7)).unwrap();

    for stats in [&result.stages_only, &result.full_run] {
        assert_eq!(stats.trials, trials);
        for s in [stats.attempts, stats.cost] {
            assert!(s.p50 <= s.p90, "p50 {} > p90 {}", s.p50, s.p90);
            assert!(s.p90 <= s.p99, "p90 {} > p99 {}", s.p90, s.p99);
        }
        for s in &stats.per_stage {
            assert!(s.p50 <= s.p90 && s.p90 <= s.p99);
        }
        assert_eq!(stats.per_stage.len(), 4);
        assert_eq!(stats.histogram.iter().map(|b| b.count).sum::<usize>(), trials);
        assert!(stats.histogram.windows(2).all(|w| w[0].start < w[1].start));
        assert!(stats.histogram.iter().all(|b| b.start % stats.bin_width == 0));
        assert!((stats.cost.mean - stats.attempts.mean * 250.0).abs() < 1e-6);
    }
    assert!(result.full_run.attempts.mean > result.stages_only.attempts.mean);
}

#[test]
fn probability_zero_batch_collapses_to_worst_case() {
    let config = UpgradeConfig::new(UpgradeSpec {
        stage_count: 2,
        stage_probabilities: vec![0.0, 0.0],
        final_probability: 0.0,
        cost_per_attempt: 1.0,
        stage_pity_threshold: 2,
        final_pity_threshold: 2,
        reset_all_stage_pity_on_any_failure: false,
    })
    .unwrap();
    let result = run_batch(&config, &request(100, 5)).unwrap();
    assert_eq!(result.worst_case.full_run.total_attempts, Bound::Finite(39));
    assert_eq!(result.worst_case.stages_only.total_attempts, Bound::Finite(12));
    for s in [
        result.full_run.attempts.mean,
        result.full_run.attempts.p50,
        result.full_run.attempts.p99,
    ] {
        assert_eq!(s, 39.0);
    }
    assert_eq!(result.stages_only.attempts.p90, 12.0);
    assert_eq!(result.full_run.histogram.len(), 1);
    assert_eq!(result.full_run.histogram[0].start, 35);
}

#[test]
fn result_carries_config_fingerprint() {
    let config = base_config();
    let result = run_batch(&config, &request(10, 1)).unwrap();
    assert_eq!(result.config_fingerprint, config.fingerprint());
    assert_eq!(result.config, config);
}

#[test]
fn serial_and_parallel_sweeps_match() {
    let grid = ParamGrid {
        stage_pity_thresholds: vec![2, 4],
        final_pity_thresholds: vec![3, 6],
        final_probabilities: vec![0.1, 0.3],
    };
    let base = base_config();
    let serial = ParamSweep::new(request(200, 11))
        .with_parallelism(false)
        .sweep(&grid, &base)
        .unwrap();
    let parallel = ParamSweep::new(request(200, 11))
        .with_parallelism(true)
        .sweep(&grid, &base)
        .unwrap();

    assert_eq!(serial.len(), grid.size());
    assert_eq!(serial, parallel);
}

#[test]
fn sweep_rejects_non_terminating_point() {
    let base = UpgradeConfig::new(UpgradeSpec {
        stage_count: 2,
        stage_probabilities: vec![0.5, 0.0],
        final_probability: 0.5,
        cost_per_attempt: 1.0,
        stage_pity_threshold: 0,
        final_pity_threshold: 0,
        reset_all_stage_pity_on_any_failure: true,
    })
    .unwrap();
    let grid = ParamGrid {
        stage_pity_thresholds: vec![0, 3],
        ..ParamGrid::default()
    };
    let err = ParamSweep::new(request(10, 1))
        .with_parallelism(false)
        .sweep(&grid, &base)
        .unwrap_err();
    assert!(matches!(err, BatchError::Simulation(_)));
}
