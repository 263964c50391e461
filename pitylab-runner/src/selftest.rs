//! Self-test harness — fixed-input regression checks.
//!
//! Each check runs the engine on a hard-coded configuration and compares the
//! outcome to a known deterministic answer. Goldens for the random source and
//! the seed-42 trials are bit-exact: any change to the LCG recurrence, the draw
//! order, or the short-circuit on guaranteed attempts breaks them.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use pitylab_core::{
    full_run_worst_case, stages_only_worst_case, Bound, Lcg, Simulator, UpgradeConfig, UpgradeSpec,
};

use crate::batch::{run_batch, BatchRequest};
use crate::stats::{histogram, percentile, HistogramBin};

/// Outcome of one named check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// All checks from one harness run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfTestReport {
    pub checks: Vec<CheckResult>,
}

impl SelfTestReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

type Check = fn() -> Result<String, String>;

const CHECKS: &[(&str, Check)] = &[
    ("lcg_golden_seed_42", lcg_golden_seed_42),
    ("lcg_seed_coercion", lcg_seed_coercion),
    ("certain_success", certain_success),
    ("probability_zero_equals_worst_case", probability_zero_equals_worst_case),
    ("reset_policy_unbounded", reset_policy_unbounded),
    ("histogram_bins", histogram_bins),
    ("golden_first_trial_seed_42", golden_first_trial_seed_42),
    ("cost_identity", cost_identity),
    ("percentile_ordering", percentile_ordering),
];

/// Run every check. Never panics; failures are reported in the report.
pub fn run_self_tests() -> SelfTestReport {
    let checks: Vec<CheckResult> = CHECKS
        .iter()
        .map(|(name, check)| {
            let (passed, detail) = match check() {
                Ok(detail) => (true, detail),
                Err(detail) => {
                    error!(check = *name, %detail, "self-test failed");
                    (false, detail)
                }
            };
            CheckResult {
                name: (*name).to_string(),
                passed,
                detail,
            }
        })
        .collect();

    let passed = checks.iter().filter(|c| c.passed).count();
    info!(passed, total = checks.len(), "self-test complete");
    SelfTestReport { checks }
}

fn expect_eq<T: PartialEq + std::fmt::Debug>(what: &str, actual: T, expected: T) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("{what}: expected {expected:?}, got {actual:?}"))
    }
}

fn build(spec: UpgradeSpec) -> Result<UpgradeConfig, String> {
    UpgradeConfig::new(spec).map_err(|e| e.to_string())
}

fn reference_spec() -> UpgradeSpec {
    UpgradeSpec {
        stage_count: 3,
        stage_probabilities: vec![0.5, 0.4, 0.3],
        final_probability: 0.2,
        cost_per_attempt: 100.0,
        stage_pity_threshold: 3,
        final_pity_threshold: 4,
        reset_all_stage_pity_on_any_failure: false,
    }
}

fn lcg_golden_seed_42() -> Result<String, String> {
    let mut rng = Lcg::new(42);
    let states: Vec<u32> = (0..3).map(|_| rng.next_u32()).collect();
    expect_eq("states", states, vec![1_083_814_273, 378_494_188, 2_479_403_867])?;
    let mut rng = Lcg::new(42);
    expect_eq("first draw", rng.next_f64(), 0.25234517484259444)?;
    Ok("first three states match".into())
}

fn lcg_seed_coercion() -> Result<String, String> {
    expect_eq("seed 0", Lcg::new(0).state(), 1)?;
    expect_eq("seed -7", Lcg::new(-7).state(), 4_294_967_289)?;
    expect_eq("seed 2^32 + 5", Lcg::new((1 << 32) + 5).state(), 5)?;
    Ok("zero and out-of-range seeds coerced".into())
}

fn certain_success() -> Result<String, String> {
    let config = build(UpgradeSpec {
        stage_count: 3,
        stage_probabilities: vec![1.0; 3],
        final_probability: 1.0,
        ..reference_spec()
    })?;
    let sim = Simulator::new(&config).map_err(|e| e.to_string())?;
    let mut rng = Lcg::new(42);
    let stages = sim.stages_only(&mut rng).map_err(|e| e.to_string())?;
    expect_eq("stages-only attempts", stages.total_attempts, 3)?;
    expect_eq("stages-only per stage", stages.attempts_per_stage, vec![1, 1, 1])?;
    let full = sim.full_run(&mut rng).map_err(|e| e.to_string())?;
    expect_eq("full-run attempts", full.total_attempts, 4)?;
    expect_eq("full-run per stage", full.attempts_per_stage, vec![1, 1, 1])?;
    Ok("3 and 4 attempts".into())
}

fn probability_zero_equals_worst_case() -> Result<String, String> {
    let config = build(UpgradeSpec {
        stage_count: 2,
        stage_probabilities: vec![0.0; 2],
        final_probability: 0.0,
        stage_pity_threshold: 2,
        final_pity_threshold: 2,
        ..reference_spec()
    })?;
    let worst = full_run_worst_case(&config);
    let sim = Simulator::new(&config).map_err(|e| e.to_string())?;
    for seed in [1, 42, 1_000_003] {
        let outcome = sim.full_run(&mut Lcg::new(seed)).map_err(|e| e.to_string())?;
        expect_eq(
            "full-run attempts vs worst case",
            Bound::Finite(u128::from(outcome.total_attempts)),
            worst.total_attempts,
        )?;
    }
    Ok(format!("{} attempts for every seed", worst.total_attempts))
}

fn reset_policy_unbounded() -> Result<String, String> {
    let config = build(UpgradeSpec {
        reset_all_stage_pity_on_any_failure: true,
        ..reference_spec()
    })?;
    let stages = stages_only_worst_case(&config);
    let full = full_run_worst_case(&config);
    for (what, bound_is_unbounded) in [
        ("stages-only attempts", stages.total_attempts.is_unbounded()),
        ("stages-only cost", stages.total_cost.is_unbounded()),
        ("full-run attempts", full.total_attempts.is_unbounded()),
        ("full-run cost", full.total_cost.is_unbounded()),
    ] {
        if !bound_is_unbounded {
            return Err(format!("{what} should be unbounded"));
        }
    }
    Ok("both worst cases unbounded".into())
}

fn histogram_bins() -> Result<String, String> {
    expect_eq(
        "bins",
        histogram(&[3, 3, 7, 12], 5),
        vec![
            HistogramBin { start: 0, count: 2 },
            HistogramBin { start: 5, count: 1 },
            HistogramBin { start: 10, count: 1 },
        ],
    )?;
    Ok("(0,2) (5,1) (10,1)".into())
}

fn golden_first_trial_seed_42() -> Result<String, String> {
    let config = build(reference_spec())?;
    let sim = Simulator::new(&config).map_err(|e| e.to_string())?;
    let mut rng = Lcg::new(42);
    let stages = sim.stages_only(&mut rng).map_err(|e| e.to_string())?;
    expect_eq("stages-only attempts", stages.total_attempts, 6)?;
    expect_eq("stages-only per stage", stages.attempts_per_stage, vec![2, 2, 2])?;
    let full = sim.full_run(&mut rng).map_err(|e| e.to_string())?;
    expect_eq("full-run attempts", full.total_attempts, 27)?;
    expect_eq("full-run per stage", full.attempts_per_stage, vec![15, 7, 4])?;
    Ok("6 then 27 attempts".into())
}

fn cost_identity() -> Result<String, String> {
    let config = build(reference_spec())?;
    let sim = Simulator::new(&config).map_err(|e| e.to_string())?;
    let mut rng = Lcg::new(7);
    for _ in 0..100 {
        for outcome in [
            sim.stages_only(&mut rng).map_err(|e| e.to_string())?,
            sim.full_run(&mut rng).map_err(|e| e.to_string())?,
        ] {
            expect_eq(
                "cost",
                outcome.total_cost,
                outcome.total_attempts as f64 * config.cost_per_attempt(),
            )?;
        }
    }
    let worst = full_run_worst_case(&config);
    expect_eq(
        "worst-case cost",
        worst.total_cost,
        worst.total_attempts.map(|a| a as f64 * config.cost_per_attempt()),
    )?;
    Ok("200 runs and the worst case".into())
}

fn percentile_ordering() -> Result<String, String> {
    expect_eq("single element", percentile(&[4.0], 0.73), 4.0)?;
    let config = build(reference_spec())?;
    let request = BatchRequest {
        trials: 500,
        ..BatchRequest::default()
    };
    let result = run_batch(&config, &request).map_err(|e| e.to_string())?;
    for (mode, stats) in [("stages-only", &result.stages_only), ("full-run", &result.full_run)] {
        for (metric, s) in [("attempts", stats.attempts), ("cost", stats.cost)] {
            if !(s.p50 <= s.p90 && s.p90 <= s.p99) {
                return Err(format!("{mode} {metric}: p50 {} p90 {} p99 {}", s.p50, s.p90, s.p99));
            }
        }
        let binned: usize = stats.histogram.iter().map(|b| b.count).sum();
        expect_eq("histogram total", binned, request.trials)?;
    }
    Ok("p50 <= p90 <= p99 over 500 trials".into())
}
