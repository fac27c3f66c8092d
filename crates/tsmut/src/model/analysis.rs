//! Structural analysis of transition systems.
//!
//! Implements reachability analysis, orphan detection and merge-point
//! detection following model checking practice.
//! Reference: Lamport, "Specifying Systems" (2002)

use super::TransitionSystem;
use crate::result::Warning;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Result of analysing a transition system.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Reachability information
    pub reachability: ReachabilityInfo,
    /// Reachable states without outgoing transitions
    pub terminal_states: BTreeSet<String>,
    /// Reachable states entered by more than one reachable transition
    pub merge_points: BTreeMap<String, usize>,
    /// Reachable self-loops as `(state, action)`
    pub self_loops: Vec<(String, String)>,
    /// Whether every reachable state has a single incoming history
    pub is_linear: bool,
    /// List of detected issues
    pub issues: Vec<AnalysisIssue>,
}

/// Information about state reachability.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReachabilityInfo {
    /// States reachable from the start state
    pub reachable_states: BTreeSet<String>,
    /// States that cannot be reached (orphans)
    pub unreachable_states: BTreeSet<String>,
    /// Number of transitions leaving reachable states
    pub reachable_transitions: usize,
}

/// Issues found during analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AnalysisIssue {
    /// State is not reachable from the start state
    UnreachableState { state_id: String },
    /// State has several incoming transitions
    MergePoint { state_id: String, incoming: usize },
    /// Transition loops back to its own source
    SelfLoop { state_id: String, action: String },
}

impl AnalysisIssue {
    /// Get the severity of this issue.
    pub fn severity(&self) -> IssueSeverity {
        match self {
            AnalysisIssue::UnreachableState { .. } => IssueSeverity::Warning,
            AnalysisIssue::MergePoint { .. } => IssueSeverity::Info,
            AnalysisIssue::SelfLoop { .. } => IssueSeverity::Info,
        }
    }
}

/// Severity levels for analysis issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum IssueSeverity {
    Info,
    Warning,
}

impl AnalysisReport {
    /// Warnings to surface alongside downstream results.
    pub fn warnings(&self) -> Vec<Warning> {
        self.reachability
            .unreachable_states
            .iter()
            .map(|state_id| Warning::UnreachableState {
                state_id: state_id.clone(),
            })
            .collect()
    }
}

/// Transition system analyzer.
#[derive(Debug)]
pub struct ModelAnalyzer<'a> {
    system: &'a TransitionSystem,
}

impl<'a> ModelAnalyzer<'a> {
    /// Create a new analyzer for the given model.
    pub fn new(system: &'a TransitionSystem) -> Self {
        Self { system }
    }

    /// Perform the full analysis.
    pub fn analyze(&self) -> AnalysisReport {
        let mut issues = Vec::new();

        let reachability = self.compute_reachability();
        for state_id in &reachability.unreachable_states {
            issues.push(AnalysisIssue::UnreachableState {
                state_id: state_id.clone(),
            });
        }

        let merge_points = self.merge_points(&reachability);
        for (state_id, incoming) in &merge_points {
            issues.push(AnalysisIssue::MergePoint {
                state_id: state_id.clone(),
                incoming: *incoming,
            });
        }

        let self_loops = self.self_loops(&reachability);
        for (state_id, action) in &self_loops {
            issues.push(AnalysisIssue::SelfLoop {
                state_id: state_id.clone(),
                action: action.clone(),
            });
        }

        let terminal_states = reachability
            .reachable_states
            .iter()
            .filter(|id| self.system.is_terminal(id))
            .cloned()
            .collect();

        // The start state must not be re-entered either.
        let start_reentered = self
            .incoming_counts(&reachability)
            .contains_key(self.system.start());

        AnalysisReport {
            is_linear: merge_points.is_empty() && !start_reentered,
            reachability,
            terminal_states,
            merge_points,
            self_loops,
            issues,
        }
    }

    fn compute_reachability(&self) -> ReachabilityInfo {
        let reachable = self.system.reachable_states();
        let unreachable = self
            .system
            .state_ids()
            .filter(|id| !reachable.contains(*id))
            .map(str::to_string)
            .collect();
        let reachable_transitions = reachable
            .iter()
            .filter_map(|id| self.system.state(id))
            .map(|s| s.transitions.len())
            .sum();

        ReachabilityInfo {
            reachable_states: reachable,
            unreachable_states: unreachable,
            reachable_transitions,
        }
    }

    /// Incoming transition counts, restricted to reachable sources.
    fn incoming_counts(&self, reachability: &ReachabilityInfo) -> BTreeMap<String, usize> {
        let mut incoming: BTreeMap<String, usize> = BTreeMap::new();
        for state_id in &reachability.reachable_states {
            if let Some(state) = self.system.state(state_id) {
                for transition in &state.transitions {
                    *incoming.entry(transition.target.clone()).or_default() += 1;
                }
            }
        }
        incoming
    }

    fn merge_points(&self, reachability: &ReachabilityInfo) -> BTreeMap<String, usize> {
        self.incoming_counts(reachability)
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .collect()
    }

    fn self_loops(&self, reachability: &ReachabilityInfo) -> Vec<(String, String)> {
        reachability
            .reachable_states
            .iter()
            .filter_map(|id| self.system.state(id))
            .flat_map(|state| {
                state
                    .transitions
                    .iter()
                    .filter(move |t| t.target == state.id)
                    .map(move |t| (state.id.clone(), t.action.clone()))
            })
            .collect()
    }
}

/// Generate a state diagram in DOT format for visualization.
pub fn to_dot(system: &TransitionSystem) -> String {
    let mut dot = String::new();
    dot.push_str("digraph TransitionSystem {\n");
    dot.push_str("  rankdir=LR;\n");
    dot.push_str("  node [shape=ellipse];\n");

    dot.push_str(&format!(
        "  __start [shape=point];\n  __start -> \"{}\";\n",
        escape_dot(system.start())
    ));

    for state in system.states() {
        let shape = if state.is_terminal() {
            "doublecircle"
        } else {
            "ellipse"
        };
        dot.push_str(&format!("  \"{}\" [shape={}];\n", escape_dot(&state.id), shape));
    }

    for edge in system.edges() {
        dot.push_str(&format!(
            "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
            escape_dot(&edge.source),
            escape_dot(&edge.target),
            escape_dot(&edge.action)
        ));
    }

    dot.push_str("}\n");
    dot
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
