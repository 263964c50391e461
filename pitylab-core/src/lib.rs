//! PityLab Core — configuration, deterministic random source, simulator, worst case.
//!
//! This crate models a sequential upgrade process: build N ordered stages, each
//! with its own success probability and pity counter, then attempt one final
//! upgrade with its own probability and persistent pity.
//! - Validated, immutable upgrade configuration
//! - 32-bit LCG with a fixed recurrence for bit-identical reproducibility
//! - Stages-only and full-run simulation modes
//! - Exact adversarial (worst-case) cost with an explicit unbounded tag
//!
//! Everything here is pure and synchronous. Batching, statistics and export
//! live in `pitylab-runner`.

pub mod config;
pub mod domain;
pub mod rng;
pub mod simulator;
pub mod worst_case;

pub use config::{ConfigError, UpgradeConfig, UpgradeSpec};
pub use domain::{Bound, RunOutcome, WorstCaseOutcome};
pub use rng::{Lcg, UniformSource};
pub use simulator::{SimulationError, Simulator, DEFAULT_ATTEMPT_CEILING};
pub use worst_case::{full_run_worst_case, stages_only_worst_case};
