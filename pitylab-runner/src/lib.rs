//! PityLab Runner — Monte Carlo batches, statistics, sweeps, self-test, export.
//!
//! This crate builds on `pitylab-core` to provide:
//! - Batch runner sharing one seeded stream across all trials
//! - Mean / percentile / histogram reduction with per-stage tables
//! - Worst-case bounds attached to every batch result
//! - Parameter sweeps over pity thresholds and final probability
//! - Fixed-input self-test harness
//! - TOML scenario files and JSON/CSV export

pub mod batch;
pub mod export;
pub mod scenario;
pub mod selftest;
pub mod stats;
pub mod sweep;

pub use batch::{
    run_batch, simulate_trials, BatchError, BatchRequest, BatchResult, RunMode, TrialOutcomes,
    WorstCaseBounds, MAX_TRIALS, SCHEMA_VERSION,
};
pub use export::{
    export_histogram_csv, export_json, export_stages_csv, import_json, write_artifact,
    ExportBundle,
};
pub use scenario::{Scenario, ScenarioError};
pub use selftest::{run_self_tests, CheckResult, SelfTestReport};
pub use stats::{
    histogram, mean, percentile, summarize_per_stage, AggregateStatistics, HistogramBin, Summary,
};
pub use sweep::{ParamGrid, ParamSweep};
