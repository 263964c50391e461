//! Monte Carlo batch runner.
//!
//! One LCG is built from the request seed and shared by every trial. Each trial
//! draws a stages-only outcome and then a full-run outcome from that stream, in
//! that order; trial `k + 1` starts wherever trial `k` left the generator. The
//! ordering is load-bearing: changing it changes every result for a given seed.
//!
//! The worst case depends only on the configuration, so it is computed on the
//! other side of a `rayon::join` while the sequential Monte Carlo pass runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use pitylab_core::{
    full_run_worst_case, stages_only_worst_case, Lcg, RunOutcome, SimulationError, Simulator,
    UpgradeConfig, WorstCaseOutcome, DEFAULT_ATTEMPT_CEILING,
};

use crate::stats::AggregateStatistics;

/// Current schema version for serialized batch results.
pub const SCHEMA_VERSION: u32 = 1;

/// Largest accepted trial count.
pub const MAX_TRIALS: usize = 200_000;

/// Monte Carlo pass parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchRequest {
    /// Number of trials, 1 to [`MAX_TRIALS`].
    pub trials: usize,
    /// Any integer; coerced to a generator state.
    pub seed: i64,
    /// Histogram bin width over attempts.
    pub bin_width: u64,
    /// Per-run attempt ceiling; a run that exceeds it is reported as non-converging.
    pub attempt_ceiling: u64,
}

impl Default for BatchRequest {
    fn default() -> Self {
        Self {
            trials: 10_000,
            seed: 42,
            bin_width: 5,
            attempt_ceiling: DEFAULT_ATTEMPT_CEILING,
        }
    }
}

impl BatchRequest {
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.trials == 0 {
            return Err(BatchError::InvalidRequest("trials must be positive".into()));
        }
        if self.trials > MAX_TRIALS {
            return Err(BatchError::InvalidRequest(format!(
                "trials must be at most {MAX_TRIALS} (got {})",
                self.trials
            )));
        }
        if self.bin_width == 0 {
            return Err(BatchError::InvalidRequest("bin_width must be positive".into()));
        }
        if self.attempt_ceiling == 0 {
            return Err(BatchError::InvalidRequest(
                "attempt_ceiling must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid batch request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("trial {trial} ({mode}) failed: {source}")]
    Trial {
        trial: usize,
        mode: RunMode,
        #[source]
        source: SimulationError,
    },
}

/// Which simulator entry point produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    StagesOnly,
    FullRun,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::StagesOnly => write!(f, "stages-only"),
            RunMode::FullRun => write!(f, "full-run"),
        }
    }
}

/// Deterministic adversarial bounds for both run modes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorstCaseBounds {
    pub stages_only: WorstCaseOutcome,
    pub full_run: WorstCaseOutcome,
}

impl WorstCaseBounds {
    pub fn compute(config: &UpgradeConfig) -> Self {
        Self {
            stages_only: stages_only_worst_case(config),
            full_run: full_run_worst_case(config),
        }
    }
}

/// Everything a consumer needs from one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: UpgradeConfig,
    pub config_fingerprint: String,
    pub request: BatchRequest,
    pub stages_only: AggregateStatistics,
    pub full_run: AggregateStatistics,
    pub worst_case: WorstCaseBounds,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Raw per-trial outcomes, in stream order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcomes {
    pub stages_only: Vec<RunOutcome>,
    pub full_run: Vec<RunOutcome>,
}

/// Simulate `request.trials` trials on one shared stream without reducing them.
pub fn simulate_trials(
    config: &UpgradeConfig,
    request: &BatchRequest,
) -> Result<TrialOutcomes, BatchError> {
    request.validate()?;
    let sim = Simulator::new(config)?.with_attempt_ceiling(request.attempt_ceiling);
    let mut rng = Lcg::new(request.seed);

    let mut stages_only = Vec::with_capacity(request.trials);
    let mut full_run = Vec::with_capacity(request.trials);
    for trial in 0..request.trials {
        let stages = sim.stages_only(&mut rng).map_err(|source| {
            warn!(trial, %source, "stages-only run did not converge");
            BatchError::Trial {
                trial,
                mode: RunMode::StagesOnly,
                source,
            }
        })?;
        let full = sim.full_run(&mut rng).map_err(|source| {
            warn!(trial, %source, "full run did not converge");
            BatchError::Trial {
                trial,
                mode: RunMode::FullRun,
                source,
            }
        })?;
        stages_only.push(stages);
        full_run.push(full);
    }
    debug!(trials = request.trials, "trials simulated");

    Ok(TrialOutcomes {
        stages_only,
        full_run,
    })
}

/// Run the Monte Carlo pass, reduce it, and attach worst-case bounds.
///
/// Validation happens before any simulation: an invalid request or a
/// non-terminating configuration returns an error without partial results.
pub fn run_batch(config: &UpgradeConfig, request: &BatchRequest) -> Result<BatchResult, BatchError> {
    request.validate()?;
    Simulator::new(config)?;

    let fingerprint = config.fingerprint();
    info!(
        trials = request.trials,
        seed = request.seed,
        stages = config.stage_count(),
        fingerprint = %fingerprint,
        "starting batch"
    );

    let (outcomes, worst_case) = rayon::join(
        || simulate_trials(config, request),
        || WorstCaseBounds::compute(config),
    );
    let outcomes = outcomes?;

    let stage_count = config.stage_count();
    let stages_only =
        AggregateStatistics::from_outcomes(&outcomes.stages_only, stage_count, request.bin_width);
    let full_run =
        AggregateStatistics::from_outcomes(&outcomes.full_run, stage_count, request.bin_width);

    info!(
        stages_only_mean = stages_only.attempts.mean,
        full_run_mean = full_run.attempts.mean,
        full_run_p99 = full_run.attempts.p99,
        "batch complete"
    );

    Ok(BatchResult {
        schema_version: SCHEMA_VERSION,
        config: config.clone(),
        config_fingerprint: fingerprint,
        request: *request,
        stages_only,
        full_run,
        worst_case,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitylab_core::{Bound, UpgradeSpec};

    fn config(reset: bool) -> UpgradeConfig {
        UpgradeConfig::new(UpgradeSpec {
            stage_count: 3,
            stage_probabilities: vec![0.5, 0.4, 0.3],
            final_probability: 0.2,
            cost_per_attempt: 100.0,
            stage_pity_threshold: 3,
            final_pity_threshold: 4,
            reset_all_stage_pity_on_any_failure: reset,
        })
        .unwrap()
    }

    fn request(trials: usize) -> BatchRequest {
        BatchRequest {
            trials,
            ..BatchRequest::default()
        }
    }

    #[test]
    fn zero_trials_rejected() {
        let err = run_batch(&config(false), &request(0)).unwrap_err();
        assert!(matches!(err, BatchError::InvalidRequest(_)));
    }

    #[test]
    fn oversized_trial_count_rejected_before_allocating() {
        for trials in [MAX_TRIALS + 1, usize::MAX] {
            match run_batch(&config(false), &request(trials)) {
                Err(BatchError::InvalidRequest(msg)) => assert!(msg.contains("at most")),
                other => panic!("expected invalid request, got {other:?}"),
            }
            assert!(matches!(
                simulate_trials(&config(false), &request(trials)),
                Err(BatchError::InvalidRequest(_))
            ));
        }
        assert!(request(MAX_TRIALS).validate().is_ok());
    }

    #[test]
    fn zero_bin_width_rejected() {
        let req = BatchRequest {
            bin_width: 0,
            ..request(10)
        };
        assert!(matches!(
            run_batch(&config(false), &req),
            Err(BatchError::InvalidRequest(_))
        ));
    }

    #[test]
    fn non_terminating_config_fails_before_simulating() {
        let cfg = UpgradeConfig::new(UpgradeSpec {
            stage_count: 2,
            stage_probabilities: vec![0.0, 0.0],
            final_probability: 0.0,
            cost_per_attempt: 1.0,
            stage_pity_threshold: 1,
            final_pity_threshold: 1,
            reset_all_stage_pity_on_any_failure: true,
        })
        .unwrap();
        assert!(matches!(
            run_batch(&cfg, &request(10)),
            Err(BatchError::Simulation(SimulationError::NonTerminating { stage: 0 }))
        ));
    }

    #[test]
    fn trial_ordering_interleaves_modes_on_one_stream() {
        let outcomes = simulate_trials(&config(false), &request(2)).unwrap();
        assert_eq!(outcomes.stages_only[0].total_attempts, 6);
        assert_eq!(outcomes.full_run[0].total_attempts, 27);
        assert_eq!(outcomes.stages_only[1].total_attempts, 15);
        assert_eq!(outcomes.full_run[1].total_attempts, 10);
    }

    #[test]
    fn golden_batch_statistics_seed_42() {
        let result = run_batch(&config(false), &request(1000)).unwrap();
        assert!((result.stages_only.attempts.mean - 18.64).abs() < 1e-9);
        assert_eq!(result.stages_only.attempts.p50, 17.5);
        assert_eq!(result.stages_only.attempts.p90, 34.0);
        assert!((result.stages_only.attempts.p99 - 45.01).abs() < 1e-9);
        assert!((result.full_run.attempts.mean - 63.982).abs() < 1e-9);
        assert_eq!(result.full_run.attempts.p50, 63.0);
        assert_eq!(result.full_run.attempts.p90, 113.0);
        assert!((result.full_run.attempts.p99 - 145.04).abs() < 1e-9);
    }

    #[test]
    fn ceiling_hit_names_trial_and_mode() {
        let req = BatchRequest {
            attempt_ceiling: 5,
            ..request(10)
        };
        match run_batch(&config(false), &req) {
            Err(BatchError::Trial { trial, mode, .. }) => {
                assert_eq!(trial, 0);
                assert_eq!(mode, RunMode::StagesOnly);
            }
            other => panic!("expected trial failure, got {other:?}"),
        }
    }

    #[test]
    fn worst_case_bounds_beyond_u64_serialize_to_json() {
        let cfg = UpgradeConfig::new(UpgradeSpec {
            stage_count: 20,
            stage_probabilities: vec![0.5; 20],
            final_probability: 0.5,
            cost_per_attempt: 1.0,
            stage_pity_threshold: 10,
            final_pity_threshold: 2,
            reset_all_stage_pity_on_any_failure: false,
        })
        .unwrap();
        let bounds = WorstCaseBounds::compute(&cfg);
        assert_eq!(
            bounds.stages_only.total_attempts,
            Bound::Finite(740_024_994_425_816_010_120)
        );
        assert_eq!(
            bounds.full_run.total_attempts,
            Bound::Finite(2_220_074_983_277_448_030_363)
        );

        let json = serde_json::to_string_pretty(&bounds).unwrap();
        assert!(json.contains("2220074983277448030363"));
        assert!(json.contains("740024994425816010120"));
    }

    #[test]
    fn worst_case_attached_once() {
        let result = run_batch(&config(true), &request(50)).unwrap();
        assert!(result.worst_case.stages_only.total_attempts.is_unbounded());
        assert!(result.worst_case.full_run.total_cost.is_unbounded());

        let result = run_batch(&config(false), &request(50)).unwrap();
        assert!(matches!(
            result.worst_case.full_run.total_attempts,
            Bound::Finite(_)
        ));
    }
}
