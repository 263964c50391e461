//! Worst-case calculator.
//!
//! Assumes every attempt fails unless pity forces success. No randomness.
//!
//! With reset-on-any-failure enabled the result is always unbounded: stage pity
//! is wiped by the same failures that would build it, so the adversarial
//! process never reaches a guaranteed success.
//!
//! Otherwise the adversarial process is fully determined. It is the
//! simulator's own control flow with every draw failing: starting at stage 0,
//! each attempt succeeds only when that stage's pity has reached the
//! threshold (pity clears, advance), and otherwise fails (pity + 1, back to
//! stage 0). The full run appends one final attempt after each complete build,
//! succeeding once final pity reaches its threshold and otherwise rebuilding
//! from stage 0 with stage pity at zero. That walk is exponential in the stage
//! count, so the attempts are summed in closed form instead; the test
//! `closed_form_matches_literal_walk` runs the literal walk and checks both agree.
//!
//! Building stage `j` after a fresh prefix takes `threshold + 1` attempts at
//! `j` (the last one guaranteed), and each of the `threshold` failures sends
//! the run back to stage 0, where the prefix must be rebuilt from zero pity.
//! Accumulating stage by stage, with `prefix` the cost of building stages `0..j`:
//!
//! ```text
//! prefix(j + 1) = prefix(j) + (threshold + 1) + threshold * prefix(j)
//!               = (threshold + 1) * (prefix(j) + 1)
//! ```
//!
//! The final phase repeats a full build plus one final attempt until the final
//! pity guarantee fires: `(final_threshold + 1) * (prefix(n) + 1)`.
//!
//! Attempts are counted in `u128` with checked arithmetic; anything larger is
//! reported as [`Bound::Overflow`].

use crate::config::UpgradeConfig;
use crate::domain::{Bound, WorstCaseOutcome};

/// Adversarial cost of building every stage once.
pub fn stages_only_worst_case(config: &UpgradeConfig) -> WorstCaseOutcome {
    if config.resets_all_stage_pity() {
        return WorstCaseOutcome::unbounded();
    }
    let attempts = match stage_build_attempts(config) {
        Some(a) => Bound::Finite(a),
        None => Bound::Overflow,
    };
    WorstCaseOutcome::from_attempts(attempts, config.cost_per_attempt())
}

/// Adversarial cost of a full run, final upgrade included.
pub fn full_run_worst_case(config: &UpgradeConfig) -> WorstCaseOutcome {
    if config.resets_all_stage_pity() {
        return WorstCaseOutcome::unbounded();
    }
    let attempts = stage_build_attempts(config)
        .and_then(|build| build.checked_add(1))
        .and_then(|round| round.checked_mul(u128::from(config.final_pity_threshold()) + 1));
    let attempts = match attempts {
        Some(a) => Bound::Finite(a),
        None => Bound::Overflow,
    };
    WorstCaseOutcome::from_attempts(attempts, config.cost_per_attempt())
}

/// Attempts to build stages `0..n` from zero pity under adversarial draws.
fn stage_build_attempts(config: &UpgradeConfig) -> Option<u128> {
    let per_stage = u128::from(config.stage_pity_threshold()) + 1;
    (0..config.stage_count()).try_fold(0_u128, |prefix, _| {
        prefix.checked_add(1)?.checked_mul(per_stage)
    })
}
