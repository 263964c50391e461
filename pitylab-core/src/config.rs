//! Upgrade configuration: raw serde form and the validated, immutable engine input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejections raised before any simulation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("stage_count must be at least 1 (got {0})")]
    NoStages(i64),
    #[error("expected {expected} stage probabilities, got {actual}")]
    ProbabilityCountMismatch { expected: usize, actual: usize },
    #[error("stage {stage} probability {value} is outside [0, 1]")]
    StageProbabilityOutOfRange { stage: usize, value: f64 },
    #[error("final probability {0} is outside [0, 1]")]
    FinalProbabilityOutOfRange(f64),
    #[error("{which} pity threshold must be non-negative (got {value})")]
    NegativePityThreshold { which: &'static str, value: i64 },
    #[error("{which} pity threshold {value} does not fit in 32 bits")]
    PityThresholdTooLarge { which: &'static str, value: i64 },
    #[error("cost_per_attempt must be a finite non-negative number (got {0})")]
    InvalidCost(f64),
}

/// Raw configuration as written in scenario files or supplied by a caller.
///
/// Integers are signed on purpose so that negative inputs reach validation and
/// are reported as configuration errors instead of parse failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpgradeSpec {
    pub stage_count: i64,
    pub stage_probabilities: Vec<f64>,
    pub final_probability: f64,
    #[serde(default)]
    pub cost_per_attempt: f64,
    #[serde(default)]
    pub stage_pity_threshold: i64,
    #[serde(default)]
    pub final_pity_threshold: i64,
    #[serde(default)]
    pub reset_all_stage_pity_on_any_failure: bool,
}

/// Validated upgrade configuration.
///
/// Never mutated after construction. Each simulation run keeps its own pity
/// counters; nothing here changes while a run is in progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(into = "UpgradeSpec", try_from = "UpgradeSpec")]
pub struct UpgradeConfig {
    stage_probabilities: Vec<f64>,
    final_probability: f64,
    cost_per_attempt: f64,
    stage_pity_threshold: u32,
    final_pity_threshold: u32,
    reset_all_stage_pity_on_any_failure: bool,
}

impl UpgradeConfig {
    /// Validate a raw spec.
    ///
    /// Length mismatches are rejected, never padded or truncated.
    pub fn new(spec: UpgradeSpec) -> Result<Self, ConfigError> {
        if spec.stage_count < 1 {
            return Err(ConfigError::NoStages(spec.stage_count));
        }
        let expected = usize::try_from(spec.stage_count).map_err(|_| {
            ConfigError::ProbabilityCountMismatch {
                expected: usize::MAX,
                actual: spec.stage_probabilities.len(),
            }
        })?;
        if spec.stage_probabilities.len() != expected {
            return Err(ConfigError::ProbabilityCountMismatch {
                expected,
                actual: spec.stage_probabilities.len(),
            });
        }
        for (stage, &value) in spec.stage_probabilities.iter().enumerate() {
            if !is_probability(value) {
                return Err(ConfigError::StageProbabilityOutOfRange { stage, value });
            }
        }
        if !is_probability(spec.final_probability) {
            return Err(ConfigError::FinalProbabilityOutOfRange(spec.final_probability));
        }
        let stage_pity_threshold = threshold("stage", spec.stage_pity_threshold)?;
        let final_pity_threshold = threshold("final", spec.final_pity_threshold)?;
        if !spec.cost_per_attempt.is_finite() || spec.cost_per_attempt < 0.0 {
            return Err(ConfigError::InvalidCost(spec.cost_per_attempt));
        }

        Ok(Self {
            stage_probabilities: spec.stage_probabilities,
            final_probability: spec.final_probability,
            cost_per_attempt: spec.cost_per_attempt,
            stage_pity_threshold,
            final_pity_threshold,
            reset_all_stage_pity_on_any_failure: spec.reset_all_stage_pity_on_any_failure,
        })
    }

    pub fn stage_count(&self) -> usize {
        self.stage_probabilities.len()
    }

    pub fn stage_probabilities(&self) -> &[f64] {
        &self.stage_probabilities
    }

    pub fn stage_probability(&self, stage: usize) -> f64 {
        self.stage_probabilities[stage]
    }

    pub fn final_probability(&self) -> f64 {
        self.final_probability
    }

    pub fn cost_per_attempt(&self) -> f64 {
        self.cost_per_attempt
    }

    pub fn stage_pity_threshold(&self) -> u32 {
        self.stage_pity_threshold
    }

    pub fn final_pity_threshold(&self) -> u32 {
        self.final_pity_threshold
    }

    pub fn resets_all_stage_pity(&self) -> bool {
        self.reset_all_stage_pity_on_any_failure
    }

    /// First stage the stochastic process can never pass, if any.
    ///
    /// With reset-on-any-failure every stage counter is wiped by the failure
    /// that would have incremented it, so pity never accumulates past zero. A
    /// probability-zero stage is then impassable unless the threshold is zero.
    pub fn impassable_stage(&self) -> Option<usize> {
        if !self.reset_all_stage_pity_on_any_failure || self.stage_pity_threshold == 0 {
            return None;
        }
        self.stage_probabilities.iter().position(|&p| p == 0.0)
    }

    /// Back to the raw form (lossless).
    pub fn to_spec(&self) -> UpgradeSpec {
        UpgradeSpec {
            stage_count: self.stage_count() as i64,
            stage_probabilities: self.stage_probabilities.clone(),
            final_probability: self.final_probability,
            cost_per_attempt: self.cost_per_attempt,
            stage_pity_threshold: i64::from(self.stage_pity_threshold),
            final_pity_threshold: i64::from(self.final_pity_threshold),
            reset_all_stage_pity_on_any_failure: self.reset_all_stage_pity_on_any_failure,
        }
    }

    /// Deterministic identity of this configuration (BLAKE3 of canonical JSON).
    ///
    /// Two configurations with identical fields always share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(&self.to_spec()).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

impl TryFrom<UpgradeSpec> for UpgradeConfig {
    type Error = ConfigError;

    fn try_from(spec: UpgradeSpec) -> Result<Self, Self::Error> {
        Self::new(spec)
    }
}

impl From<UpgradeConfig> for UpgradeSpec {
    fn from(config: UpgradeConfig) -> Self {
        config.to_spec()
    }
}

fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn threshold(which: &'static str, value: i64) -> Result<u32, ConfigError> {
    if value < 0 {
        return Err(ConfigError::NegativePityThreshold { which, value });
    }
    u32::try_from(value).map_err(|_| ConfigError::PityThresholdTooLarge { which, value })
}
