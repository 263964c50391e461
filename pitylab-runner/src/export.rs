//! Export — JSON bundle and CSV tables for a single batch result.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: histogram bins and the per-stage table for external tools
//!
//! Unknown schema versions are rejected on import.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::{BatchResult, SCHEMA_VERSION};
use crate::stats::AggregateStatistics;

/// A batch result plus provenance for the written artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBundle {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub result: BatchResult,
}

impl ExportBundle {
    pub fn new(result: BatchResult) -> Self {
        Self {
            generated_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            result,
        }
    }
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a result bundle to pretty JSON.
pub fn export_json(bundle: &ExportBundle) -> Result<String> {
    serde_json::to_string_pretty(bundle).context("failed to serialize batch result to JSON")
}

/// Deserialize a bundle, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<ExportBundle> {
    let bundle: ExportBundle =
        serde_json::from_str(json).context("failed to deserialize batch result from JSON")?;
    if bundle.result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            bundle.result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(bundle)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Histogram bins of both families: mode, bin_start, bin_end, count.
pub fn export_histogram_csv(result: &BatchResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["mode", "bin_start", "bin_end", "count"])?;
    for (mode, stats) in families(result) {
        for bin in &stats.histogram {
            wtr.write_record([
                mode.to_string(),
                bin.start.to_string(),
                (bin.start + stats.bin_width).to_string(),
                bin.count.to_string(),
            ])?;
        }
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Per-stage attempt table of both families: mode, stage, mean, p50, p90, p99.
pub fn export_stages_csv(result: &BatchResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["mode", "stage", "mean", "p50", "p90", "p99"])?;
    for (mode, stats) in families(result) {
        for (stage, s) in stats.per_stage.iter().enumerate() {
            wtr.write_record([
                mode.to_string(),
                (stage + 1).to_string(),
                format!("{:.4}", s.mean),
                format!("{:.4}", s.p50),
                format!("{:.4}", s.p90),
                format!("{:.4}", s.p99),
            ])?;
        }
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn families(result: &BatchResult) -> [(&'static str, &AggregateStatistics); 2] {
    [
        ("stages_only", &result.stages_only),
        ("full_run", &result.full_run),
    ]
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
