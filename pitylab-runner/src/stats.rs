//! Batch statistics — mean, interpolated percentiles, sparse histograms.
//!
//! All functions are pure: samples in, summary out.

use std::collections::BTreeMap;

use pitylab_core::RunOutcome;
use serde::{Deserialize, Serialize};

/// Mean and three tail percentiles of one sample set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
}

impl Summary {
    /// Summarize unsorted samples. An empty set summarizes to all zeros.
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Self {
            mean: mean(&sorted),
            p50: percentile(&sorted, 0.50),
            p90: percentile(&sorted, 0.90),
            p99: percentile(&sorted, 0.99),
        }
    }
}

/// One bucket of a sparse histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower edge: `floor(value / width) * width`.
    pub start: u64,
    pub count: usize,
}

/// Summary statistics for one outcome family (stages-only or full-run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStatistics {
    pub trials: usize,
    pub attempts: Summary,
    pub cost: Summary,
    /// Indexed by stage.
    pub per_stage: Vec<Summary>,
    pub histogram: Vec<HistogramBin>,
    pub bin_width: u64,
}

impl AggregateStatistics {
    /// Reduce a batch of outcomes. All outcomes must share one stage count.
    pub fn from_outcomes(outcomes: &[RunOutcome], stage_count: usize, bin_width: u64) -> Self {
        let attempts: Vec<u64> = outcomes.iter().map(|o| o.total_attempts).collect();
        let attempts_f: Vec<f64> = attempts.iter().map(|&a| a as f64).collect();
        let costs: Vec<f64> = outcomes.iter().map(|o| o.total_cost).collect();

        let mut per_stage_samples = vec![Vec::with_capacity(outcomes.len()); stage_count];
        for outcome in outcomes {
            for (stage, &count) in outcome.attempts_per_stage.iter().enumerate() {
                per_stage_samples[stage].push(count as f64);
            }
        }

        Self {
            trials: outcomes.len(),
            attempts: Summary::from_samples(&attempts_f),
            cost: Summary::from_samples(&costs),
            per_stage: summarize_per_stage(&per_stage_samples),
            histogram: histogram(&attempts, bin_width),
            bin_width,
        }
    }
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Linearly interpolated percentile of a non-decreasing slice, `p` in `[0, 1]`.
///
/// Position is `(len - 1) * p`; the fractional part interpolates toward the
/// next sample when one exists. Returns 0 for an empty slice. `p` outside
/// `[0, 1]` is clamped to the nearest end; a NaN `p` is treated as 0.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
    let position = (sorted.len() - 1) as f64 * p;
    let base = position.floor() as usize;
    let frac = position - base as f64;
    match sorted.get(base + 1) {
        Some(&next) => sorted[base] + frac * (next - sorted[base]),
        None => sorted[base],
    }
}

/// Sparse histogram: bins sorted by start, empty bins omitted.
///
/// `bin_width` must be positive; batch requests validate it before reaching here.
pub fn histogram(samples: &[u64], bin_width: u64) -> Vec<HistogramBin> {
    let width = bin_width.max(1);
    let mut bins: BTreeMap<u64, usize> = BTreeMap::new();
    for &value in samples {
        *bins.entry(value / width * width).or_default() += 1;
    }
    bins.into_iter()
        .map(|(start, count)| HistogramBin { start, count })
        .collect()
}

/// Summarize each stage's attempt counts across a batch.
pub fn summarize_per_stage(per_stage_samples: &[Vec<f64>]) -> Vec<Summary> {
    per_stage_samples
        .iter()
        .map(|samples| Summary::from_samples(samples))
        .collect()
}
