//! Parameter sweep over pity thresholds and final probability.
//!
//! Every grid point is an independent batch with its own generator built from
//! the request seed, so points can run in parallel and still match a serial
//! sweep exactly.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pitylab_core::{UpgradeConfig, UpgradeSpec};

use crate::batch::{run_batch, BatchError, BatchRequest, BatchResult};

/// Values to substitute into a base configuration.
///
/// An empty axis keeps the base configuration's value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamGrid {
    pub stage_pity_thresholds: Vec<u32>,
    pub final_pity_thresholds: Vec<u32>,
    pub final_probabilities: Vec<f64>,
}

impl ParamGrid {
    /// Total number of configurations in this grid.
    pub fn size(&self) -> usize {
        self.stage_pity_thresholds.len().max(1)
            * self.final_pity_thresholds.len().max(1)
            * self.final_probabilities.len().max(1)
    }

    /// Generate every configuration in the grid, validated.
    pub fn generate_configs(&self, base: &UpgradeConfig) -> Result<Vec<UpgradeConfig>, BatchError> {
        let base_spec = base.to_spec();
        let stage_pity = axis(&self.stage_pity_thresholds, base.stage_pity_threshold());
        let final_pity = axis(&self.final_pity_thresholds, base.final_pity_threshold());
        let final_p = axis(&self.final_probabilities, base.final_probability());

        let mut configs = Vec::with_capacity(self.size());
        for &sp in &stage_pity {
            for &fp in &final_pity {
                for &p in &final_p {
                    let spec = UpgradeSpec {
                        stage_pity_threshold: i64::from(sp),
                        final_pity_threshold: i64::from(fp),
                        final_probability: p,
                        ..base_spec.clone()
                    };
                    let config = UpgradeConfig::new(spec)
                        .map_err(|e| BatchError::InvalidRequest(format!("sweep grid: {e}")))?;
                    configs.push(config);
                }
            }
        }
        Ok(configs)
    }
}

fn axis<T: Copy>(values: &[T], fallback: T) -> Vec<T> {
    if values.is_empty() {
        vec![fallback]
    } else {
        values.to_vec()
    }
}

/// Sweep executor.
pub struct ParamSweep {
    request: BatchRequest,
    parallel: bool,
}

impl ParamSweep {
    pub fn new(request: BatchRequest) -> Self {
        Self {
            request,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run one batch per grid point, results in grid order.
    pub fn sweep(&self, grid: &ParamGrid, base: &UpgradeConfig) -> Result<Vec<BatchResult>, BatchError> {
        let configs = grid.generate_configs(base)?;
        debug!(points = configs.len(), parallel = self.parallel, "starting sweep");

        if self.parallel {
            configs.par_iter().map(|config| self.run_point(config)).collect()
        } else {
            configs.iter().map(|config| self.run_point(config)).collect()
        }
    }

    fn run_point(&self, config: &UpgradeConfig) -> Result<BatchResult, BatchError> {
        debug!(
            stage_pity = config.stage_pity_threshold(),
            final_pity = config.final_pity_threshold(),
            final_probability = config.final_probability(),
            "sweep point"
        );
        run_batch(config, &self.request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> UpgradeConfig {
        UpgradeConfig::new(UpgradeSpec {
            stage_count: 2,
            stage_probabilities: vec![0.7, 0.5],
            final_probability: 0.3,
            cost_per_attempt: 10.0,
            stage_pity_threshold: 2,
            final_pity_threshold: 3,
            reset_all_stage_pity_on_any_failure: false,
        })
        .unwrap()
    }

    #[test]
    fn empty_grid_is_the_base_config() {
        let grid = ParamGrid::default();
        assert_eq!(grid.size(), 1);
        assert_eq!(grid.generate_configs(&base()).unwrap(), vec![base()]);
    }

    #[test]
    fn grid_expands_cartesian_product() {
        let grid = ParamGrid {
            stage_pity_thresholds: vec![1, 2],
            final_pity_thresholds: vec![],
            final_probabilities: vec![0.1, 0.2, 0.3],
        };
        let configs = grid.generate_configs(&base()).unwrap();
        assert_eq!(configs.len(), grid.size());
        assert_eq!(configs.len(), 6);
        assert!(configs.iter().all(|c| c.final_pity_threshold() == 3));
        assert_eq!(configs[5].stage_pity_threshold(), 2);
        assert_eq!(configs[5].final_probability(), 0.3);
    }

    #[test]
    fn invalid_grid_value_rejected() {
        let grid = ParamGrid {
            final_probabilities: vec![1.5],
            ..ParamGrid::default()
        };
        assert!(matches!(
            grid.generate_configs(&base()),
            Err(BatchError::InvalidRequest(_))
        ));
    }
}
