//! Stochastic process simulator.
//!
//! Two run modes share one stage-build state machine:
//! - `stages_only`: build every stage once, no final attempt.
//! - `full_run`: build the stages, attempt the final upgrade, and on failure
//!   rebuild from stage 0 until the final attempt succeeds.
//!
//! A failure anywhere sends the current stage index back to 0. Stage pity
//! counters survive the restart unless reset-on-any-failure is configured; the
//! final pity counter survives every restart and clears only on final success.
//!
//! The success check short-circuits: a pity-guaranteed attempt consumes no
//! draw from the random source. Draw order is part of the reproducibility
//! contract.

use thiserror::Error;

use crate::config::UpgradeConfig;
use crate::domain::RunOutcome;
use crate::rng::UniformSource;

/// Default per-run attempt ceiling.
pub const DEFAULT_ATTEMPT_CEILING: u64 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error(
        "stage {stage} has probability 0 and its pity can never accumulate \
         while every failure resets all stage pity; the run would never terminate"
    )]
    NonTerminating { stage: usize },
    #[error("run exceeded the attempt ceiling of {ceiling} without converging")]
    AttemptCeilingExceeded { ceiling: u64 },
}

/// Runs the upgrade process against a random source.
///
/// Holds no state between runs; every call owns its own pity counters.
#[derive(Debug, Clone)]
pub struct Simulator<'a> {
    config: &'a UpgradeConfig,
    attempt_ceiling: u64,
}

/// Per-run mutable bookkeeping, discarded when the run ends.
struct RunState {
    stage_pity: Vec<u32>,
    outcome: RunOutcome,
}

impl RunState {
    fn new(stage_count: usize) -> Self {
        Self {
            stage_pity: vec![0; stage_count],
            outcome: RunOutcome::empty(stage_count),
        }
    }

    fn reset_stage_pity(&mut self) {
        self.stage_pity.iter_mut().for_each(|p| *p = 0);
    }
}

impl<'a> Simulator<'a> {
    /// Bind a simulator to a configuration.
    ///
    /// Fails fast on configurations the stochastic process can never finish.
    pub fn new(config: &'a UpgradeConfig) -> Result<Self, SimulationError> {
        if let Some(stage) = config.impassable_stage() {
            return Err(SimulationError::NonTerminating { stage });
        }
        Ok(Self {
            config,
            attempt_ceiling: DEFAULT_ATTEMPT_CEILING,
        })
    }

    pub fn with_attempt_ceiling(mut self, ceiling: u64) -> Self {
        self.attempt_ceiling = ceiling;
        self
    }

    pub fn config(&self) -> &UpgradeConfig {
        self.config
    }

    pub fn attempt_ceiling(&self) -> u64 {
        self.attempt_ceiling
    }

    /// Build every stage once.
    pub fn stages_only<R: UniformSource>(&self, rng: &mut R) -> Result<RunOutcome, SimulationError> {
        let mut state = RunState::new(self.config.stage_count());
        self.build_stages(rng, &mut state)?;
        Ok(self.finish(state))
    }

    /// Build the stages and retry the final upgrade until it succeeds.
    pub fn full_run<R: UniformSource>(&self, rng: &mut R) -> Result<RunOutcome, SimulationError> {
        let mut state = RunState::new(self.config.stage_count());
        let threshold = self.config.final_pity_threshold();
        let mut final_pity: u32 = 0;

        loop {
            self.build_stages(rng, &mut state)?;

            self.charge(&mut state, None)?;
            if final_pity >= threshold || rng.next_unit() < self.config.final_probability() {
                return Ok(self.finish(state));
            }

            final_pity += 1;
            if self.config.resets_all_stage_pity() {
                state.reset_stage_pity();
            }
        }
    }

    /// Stage-build phase: runs until every stage has succeeded in sequence.
    fn build_stages<R: UniformSource>(
        &self,
        rng: &mut R,
        state: &mut RunState,
    ) -> Result<(), SimulationError> {
        let stage_count = self.config.stage_count();
        let threshold = self.config.stage_pity_threshold();
        let mut current_stage = 0;

        while current_stage < stage_count {
            self.charge(state, Some(current_stage))?;

            let guaranteed = state.stage_pity[current_stage] >= threshold;
            if guaranteed || rng.next_unit() < self.config.stage_probability(current_stage) {
                state.stage_pity[current_stage] = 0;
                current_stage += 1;
            } else {
                state.stage_pity[current_stage] += 1;
                if self.config.resets_all_stage_pity() {
                    state.reset_stage_pity();
                }
                current_stage = 0;
            }
        }
        Ok(())
    }

    fn charge(&self, state: &mut RunState, stage: Option<usize>) -> Result<(), SimulationError> {
        if state.outcome.total_attempts >= self.attempt_ceiling {
            return Err(SimulationError::AttemptCeilingExceeded {
                ceiling: self.attempt_ceiling,
            });
        }
        state.outcome.total_attempts += 1;
        if let Some(stage) = stage {
            state.outcome.attempts_per_stage[stage] += 1;
        }
        Ok(())
    }

    fn finish(&self, state: RunState) -> RunOutcome {
        let mut outcome = state.outcome;
        outcome.total_cost = outcome.total_attempts as f64 * self.config.cost_per_attempt();
        outcome
    }
}
