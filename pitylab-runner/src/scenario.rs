//! Scenario files — an upgrade configuration plus batch settings, in TOML.
//!
//! ```toml
//! [upgrade]
//! stage_count = 3
//! stage_probabilities = [0.5, 0.4, 0.3]
//! final_probability = 0.2
//! cost_per_attempt = 100.0
//! stage_pity_threshold = 3
//! final_pity_threshold = 4
//! reset_all_stage_pity_on_any_failure = false
//!
//! [batch]
//! trials = 10000
//! seed = 42
//! bin_width = 5
//! ```
//!
//! The `[batch]` table and each of its keys are optional.

use std::path::Path;

use pitylab_core::{ConfigError, UpgradeConfig, UpgradeSpec};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::BatchRequest;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid upgrade configuration: {0}")]
    Invalid(#[from] ConfigError),
}

/// On-disk form. Validation happens in [`Scenario::from_toml`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScenarioFile {
    upgrade: UpgradeSpec,
    #[serde(default)]
    batch: BatchRequest,
}

/// A validated scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub config: UpgradeConfig,
    pub batch: BatchRequest,
}

impl Scenario {
    /// Load a scenario from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a scenario from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = toml::from_str(content)?;
        Ok(Self {
            config: UpgradeConfig::new(file.upgrade)?,
            batch: file.batch,
        })
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&ScenarioFile {
            upgrade: self.config.to_spec(),
            batch: self.batch,
        })
    }
}
