//! Trace replay and kill detection.
//!
//! A sequence kills a mutant when replaying it blocks at a different step on
//! the mutant than on the original, or blocks on only one of them. Replays
//! are pure functions of the models, so verdicts are deterministic and
//! mutants can be evaluated in any order.

use crate::config::EvaluationConfig;
use crate::generate::{TestSequence, TestSuite};
use crate::linearize::ActionRenaming;
use crate::model::TransitionSystem;
use crate::mutation::{Mutant, MutantResult};
use crate::result::{TsError, TsResult};
use crate::traces::trace_equivalent;
use serde::Serialize;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of replaying a sequence on one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Replay {
    /// Every action was enabled
    Completed {
        /// State reached after the last action
        final_state: String,
    },
    /// `action` (0-based index `step`) is not enabled in `state`
    Blocked {
        /// Index of the blocked action
        step: usize,
        /// State the replay was in
        state: String,
        /// Label that had no transition
        action: String,
    },
}

impl Replay {
    /// Step at which the replay blocked
    #[must_use]
    pub fn blocked_at(&self) -> Option<usize> {
        match self {
            Replay::Completed { .. } => None,
            Replay::Blocked { step, .. } => Some(*step),
        }
    }

    /// Whether every action executed
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Replay::Completed { .. })
    }
}

/// Replay `sequence` from the start state of `system`.
///
/// A transition matches an action when its label, passed through
/// `renaming`, equals the action. If several transitions of a state match,
/// the first in declaration order is taken.
///
/// # Errors
/// `EmptySequence` for a sequence without actions.
pub fn replay(
    system: &TransitionSystem,
    sequence: &TestSequence,
    renaming: &ActionRenaming,
) -> TsResult<Replay> {
    if sequence.is_empty() {
        return Err(TsError::EmptySequence);
    }

    let mut current = system.start();
    for (step, action) in sequence.actions.iter().enumerate() {
        let next = system.state(current).and_then(|state| {
            state
                .transitions
                .iter()
                .find(|t| renaming.original(&t.action) == action.as_str())
        });
        match next {
            Some(transition) => current = transition.target.as_str(),
            None => {
                return Ok(Replay::Blocked {
                    step,
                    state: current.to_string(),
                    action: action.clone(),
                })
            }
        }
    }

    Ok(Replay::Completed {
        final_state: current.to_string(),
    })
}

/// Verdict of one sequence against one mutant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Blocking points differ; `step` is the earlier one
    Killed {
        step: usize,
        original: Replay,
        mutant: Replay,
    },
    /// Both complete, or both block at the same step
    Survived,
}

impl Verdict {
    /// Whether the mutant was killed
    #[must_use]
    pub fn is_killed(&self) -> bool {
        matches!(self, Verdict::Killed { .. })
    }
}

/// Aggregate verdict of a suite against one mutant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuiteVerdict {
    /// Indices of the sequences that kill the mutant
    pub killing_sequences: Vec<usize>,
    /// Verdict of the first killing sequence
    pub first_kill: Option<Verdict>,
}

impl SuiteVerdict {
    /// Whether any sequence kills the mutant
    #[must_use]
    pub fn is_killed(&self) -> bool {
        !self.killing_sequences.is_empty()
    }

    /// Combine two partial verdicts (indices are kept sorted).
    #[must_use]
    pub fn merge(mut self, other: SuiteVerdict) -> SuiteVerdict {
        let other_first = other.killing_sequences.first().copied();
        let self_first = self.killing_sequences.first().copied();
        if other_first.is_some() && (self_first.is_none() || other_first < self_first) {
            self.first_kill = other.first_kill;
        }
        self.killing_sequences.extend(other.killing_sequences);
        self.killing_sequences.sort_unstable();
        self
    }
}

/// Compares an original model with one mutant.
#[derive(Debug, Clone)]
pub struct TraceEvaluator<'a> {
    original: &'a TransitionSystem,
    mutant: &'a TransitionSystem,
    renaming: ActionRenaming,
}

impl<'a> TraceEvaluator<'a> {
    /// Evaluator matching labels exactly.
    pub fn new(original: &'a TransitionSystem, mutant: &'a TransitionSystem) -> Self {
        Self {
            original,
            mutant,
            renaming: ActionRenaming::new(),
        }
    }

    /// Translate mutant labels through `renaming` before matching.
    #[must_use]
    pub fn with_renaming(mut self, renaming: ActionRenaming) -> Self {
        self.renaming = renaming;
        self
    }

    /// Verdict for a single sequence.
    ///
    /// # Errors
    /// `EmptySequence` for a sequence without actions.
    pub fn evaluate(&self, sequence: &TestSequence) -> TsResult<Verdict> {
        let original = replay(self.original, sequence, &ActionRenaming::new())?;
        let mutant = replay(self.mutant, sequence, &self.renaming)?;

        let step = match (original.blocked_at(), mutant.blocked_at()) {
            (None, None) => return Ok(Verdict::Survived),
            (Some(a), Some(b)) if a == b => return Ok(Verdict::Survived),
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
        };

        Ok(Verdict::Killed {
            step,
            original,
            mutant,
        })
    }

    /// Verdict for a whole suite; killed if any sequence kills.
    ///
    /// # Errors
    /// `EmptySequence` if the suite contains a sequence without actions.
    pub fn evaluate_suite(&self, suite: &TestSuite) -> TsResult<SuiteVerdict> {
        let mut verdict = SuiteVerdict::default();
        for (idx, sequence) in suite.iter().enumerate() {
            let outcome = self.evaluate(sequence)?;
            if outcome.is_killed() {
                verdict = verdict.merge(SuiteVerdict {
                    killing_sequences: vec![idx],
                    first_kill: Some(outcome),
                });
            }
        }
        Ok(verdict)
    }
}

/// Evaluate one mutant against the original.
///
/// # Errors
/// `EmptySequence` if the suite contains a sequence without actions.
pub fn evaluate_mutant(
    original: &TransitionSystem,
    mutant: &Mutant,
    suite: &TestSuite,
    config: &EvaluationConfig,
) -> TsResult<MutantResult> {
    let renaming = mutant.renaming.clone().unwrap_or_default();
    let equivalent = trace_equivalent(original, &mutant.system, config.trace_depth, &renaming);

    let evaluator = TraceEvaluator::new(original, &mutant.system).with_renaming(renaming);
    let verdict = evaluator.evaluate_suite(suite)?;

    let kill_reason = match &verdict.first_kill {
        Some(Verdict::Killed {
            step,
            original: expected,
            mutant: actual,
        }) => Some(format!(
            "sequence {} diverges at step {}: original {}, mutant {}",
            verdict.killing_sequences.first().copied().unwrap_or_default(),
            step,
            describe(expected),
            describe(actual)
        )),
        _ => None,
    };

    if verdict.is_killed() {
        debug!(mutant = %mutant.id, kills = verdict.killing_sequences.len(), "mutant killed");
    }

    Ok(MutantResult {
        mutant_id: mutant.id.clone(),
        class: mutant.class,
        killed: verdict.is_killed(),
        kill_reason,
        killing_sequences: verdict.killing_sequences,
        equivalent,
    })
}

fn describe(replay: &Replay) -> String {
    match replay {
        Replay::Completed { final_state } => format!("completes in '{}'", final_state),
        Replay::Blocked { state, action, .. } => {
            format!("blocks on '{}' in '{}'", action, state)
        }
    }
}

/// Evaluate independent mutants, results in input order.
///
/// With the `parallel` feature the mutants are spread over a rayon pool of
/// `config.parallel_jobs` threads (0 uses the global pool).
///
/// # Errors
/// `EmptySequence` if the suite contains a sequence without actions;
/// `InvalidConfig` if the thread pool cannot be created.
pub fn evaluate_mutants(
    original: &TransitionSystem,
    mutants: &[Mutant],
    suite: &TestSuite,
    config: &EvaluationConfig,
) -> TsResult<Vec<MutantResult>> {
    let results = run_all(original, mutants, suite, config)?;
    info!(
        mutants = results.len(),
        killed = results.iter().filter(|r| r.killed).count(),
        "evaluated mutants"
    );
    Ok(results)
}

#[cfg(feature = "parallel")]
fn run_all(
    original: &TransitionSystem,
    mutants: &[Mutant],
    suite: &TestSuite,
    config: &EvaluationConfig,
) -> TsResult<Vec<MutantResult>> {
    let run = || {
        mutants
            .par_iter()
            .map(|mutant| evaluate_mutant(original, mutant, suite, config))
            .collect::<TsResult<Vec<_>>>()
    };

    if config.parallel_jobs == 0 {
        return run();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallel_jobs)
        .build()
        .map_err(|e| TsError::invalid_config(format!("failed to create thread pool: {e}")))?;
    pool.install(run)
}

#[cfg(not(feature = "parallel"))]
fn run_all(
    original: &TransitionSystem,
    mutants: &[Mutant],
    suite: &TestSuite,
    config: &EvaluationConfig,
) -> TsResult<Vec<MutantResult>> {
    mutants
        .iter()
        .map(|mutant| evaluate_mutant(original, mutant, suite, config))
        .collect()
}
