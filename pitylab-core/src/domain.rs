//! Outcome types returned by the simulator and the worst-case calculator.

use serde::{Deserialize, Serialize};

/// Result of one simulated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Every attempt made, stage and final alike.
    pub total_attempts: u64,
    /// `total_attempts * cost_per_attempt`.
    pub total_cost: f64,
    /// Attempts against each stage index across the whole run, rebuilds included.
    pub attempts_per_stage: Vec<u64>,
}

impl RunOutcome {
    pub(crate) fn empty(stage_count: usize) -> Self {
        Self {
            total_attempts: 0,
            total_cost: 0.0,
            attempts_per_stage: vec![0; stage_count],
        }
    }
}

/// A quantity that may be finite, provably unbounded, or finite but too large
/// to represent.
///
/// Serialized with an explicit tag so an unbounded value can never be mistaken
/// for a large number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Bound<T> {
    Finite(T),
    Unbounded,
    /// Finite, but exceeds the representable range.
    Overflow,
}

impl<T: Copy> Bound<T> {
    pub fn finite(&self) -> Option<T> {
        match self {
            Bound::Finite(v) => Some(*v),
            Bound::Unbounded | Bound::Overflow => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Bound::Unbounded)
    }

    /// Apply `f` to a finite value, keeping the tag otherwise.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Bound<U> {
        match self {
            Bound::Finite(v) => Bound::Finite(f(v)),
            Bound::Unbounded => Bound::Unbounded,
            Bound::Overflow => Bound::Overflow,
        }
    }
}

impl<T: std::fmt::Display> std::fmt::Display for Bound<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::Finite(v) => write!(f, "{v}"),
            Bound::Unbounded => write!(f, "unbounded"),
            Bound::Overflow => write!(f, "overflow"),
        }
    }
}

/// Adversarial cost: every attempt fails unless pity forces success.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorstCaseOutcome {
    pub total_attempts: Bound<u128>,
    pub total_cost: Bound<f64>,
}

impl WorstCaseOutcome {
    pub fn unbounded() -> Self {
        Self {
            total_attempts: Bound::Unbounded,
            total_cost: Bound::Unbounded,
        }
    }

    pub(crate) fn from_attempts(attempts: Bound<u128>, cost_per_attempt: f64) -> Self {
        Self {
            total_attempts: attempts,
            total_cost: attempts.map(|a| a as f64 * cost_per_attempt),
        }
    }
}
