//! Coverage-driven test sequence generation.
//!
//! Sequences are grown depth-first along edges not yet covered, so every
//! sequence adds coverage. When the walk runs dry, generation reconnects
//! through the shortest prefix to the nearest state that still has an
//! uncovered outgoing edge. All walks are iterative and bounded by
//! `max_path_length`.

use crate::config::GenerationConfig;
use crate::model::{Edge, TransitionSystem};
use crate::result::Warning;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::{debug, info, warn};

/// Set of covered transitions, threaded explicitly through generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSet {
    edges: BTreeSet<Edge>,
}

impl CoverageSet {
    /// Empty coverage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an edge covered; returns false if it already was.
    pub fn insert(&mut self, edge: Edge) -> bool {
        self.edges.insert(edge)
    }

    /// Whether an edge is covered
    #[must_use]
    pub fn contains(&self, edge: &Edge) -> bool {
        self.edges.contains(edge)
    }

    /// Number of covered edges
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether nothing is covered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Covered edges in order
    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    fn covers(&self, source: &str, action: &str, target: &str) -> bool {
        self.edges.contains(&Edge::new(source, action, target))
    }
}

/// Ordered action sequence executed from the start state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestSequence {
    /// Actions in execution order
    pub actions: Vec<String>,
}

impl TestSequence {
    /// Create a sequence from action labels
    pub fn new<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of actions
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the sequence has no action
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Ordered collection of test sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuite {
    /// Sequences in generation order
    pub sequences: Vec<TestSequence>,
}

impl TestSuite {
    /// Create a suite
    #[must_use]
    pub fn new(sequences: Vec<TestSequence>) -> Self {
        Self { sequences }
    }

    /// Number of sequences
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Whether the suite is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Iterate sequences
    pub fn iter(&self) -> impl Iterator<Item = &TestSequence> {
        self.sequences.iter()
    }

    /// Total number of actions over all sequences
    #[must_use]
    pub fn total_actions(&self) -> usize {
        self.sequences.iter().map(TestSequence::len).sum()
    }
}

/// Coverage achieved on one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// States in the model
    pub total_states: usize,
    /// Transitions in the model
    pub total_transitions: usize,
    /// Transitions traversed by at least one sequence
    pub covered_transitions: usize,
    /// States entered by at least one sequence (the start included)
    pub visited_states: BTreeSet<String>,
    /// States unreachable from the start
    pub unreachable_states: BTreeSet<String>,
    /// Transitions no sequence traverses
    pub uncovered_transitions: Vec<Edge>,
}

impl CoverageReport {
    /// Ratio of covered transitions; 1.0 for a model without transitions.
    #[must_use]
    pub fn edge_coverage(&self) -> f64 {
        if self.total_transitions == 0 {
            1.0
        } else {
            self.covered_transitions as f64 / self.total_transitions as f64
        }
    }

    /// Ratio of visited states
    #[must_use]
    pub fn state_coverage(&self) -> f64 {
        if self.total_states == 0 {
            1.0
        } else {
            self.visited_states.len() as f64 / self.total_states as f64
        }
    }

    /// Whether every state and transition is covered
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.covered_transitions == self.total_transitions
            && self.visited_states.len() == self.total_states
    }
}

/// Result of a generation run.
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    /// Generated sequences
    pub suite: TestSuite,
    /// Coverage after generation (input coverage included)
    pub covered: CoverageSet,
    /// Coverage summary
    pub report: CoverageReport,
    /// Unreachable states and transitions beyond the bound
    pub warnings: Vec<Warning>,
}

/// Shortest-path tree from the start state.
struct Distances<'a> {
    order: Vec<&'a str>,
    depth: HashMap<&'a str, usize>,
    parent: HashMap<&'a str, (&'a str, &'a str)>,
}

impl<'a> Distances<'a> {
    fn from_start(system: &'a TransitionSystem) -> Self {
        let mut order = vec![system.start()];
        let mut depth = HashMap::from([(system.start(), 0)]);
        let mut parent = HashMap::new();
        let mut queue = VecDeque::from([system.start()]);

        while let Some(current) = queue.pop_front() {
            let next_depth = depth.get(current).copied().unwrap_or(0) + 1;
            let Some(state) = system.state(current) else {
                continue;
            };
            for transition in &state.transitions {
                let target = transition.target.as_str();
                if !depth.contains_key(target) {
                    depth.insert(target, next_depth);
                    parent.insert(target, (current, transition.action.as_str()));
                    order.push(target);
                    queue.push_back(target);
                }
            }
        }

        Self {
            order,
            depth,
            parent,
        }
    }

    /// Edges of the shortest path from the start to `state`.
    fn path_to(&self, state: &'a str) -> Vec<(&'a str, &'a str, &'a str)> {
        let mut path = Vec::new();
        let mut cursor = state;
        while let Some(&(previous, action)) = self.parent.get(cursor) {
            path.push((previous, action, cursor));
            cursor = previous;
        }
        path.reverse();
        path
    }
}

/// Coverage-driven test generator.
#[derive(Debug, Clone, Default)]
pub struct TestGenerator {
    config: GenerationConfig,
}

impl TestGenerator {
    /// Create a generator with the given bounds.
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    /// Generate a suite from scratch.
    #[must_use]
    pub fn generate(&self, system: &TransitionSystem) -> Generation {
        self.generate_with(system, CoverageSet::new())
    }

    /// Generate sequences for the edges not yet in `covered`.
    #[must_use]
    pub fn generate_with(&self, system: &TransitionSystem, mut covered: CoverageSet) -> Generation {
        let bound = self.config.max_path_length;
        let distances = Distances::from_start(system);
        let mut sequences = Vec::new();

        let has_uncovered = |covered: &CoverageSet, state_id: &str| {
            system.state(state_id).is_some_and(|state| {
                state
                    .transitions
                    .iter()
                    .any(|t| !covered.covers(state_id, &t.action, &t.target))
            })
        };

        loop {
            // nearest state, in breadth-first order, that can still add coverage
            let entry = distances.order.iter().copied().find(|id| {
                distances.depth.get(id).is_some_and(|&d| d < bound) && has_uncovered(&covered, id)
            });
            let Some(entry) = entry else {
                break;
            };

            let mut path: Vec<String> = Vec::new();
            for (source, action, target) in distances.path_to(entry) {
                covered.insert(Edge::new(source, action, target));
                path.push(action.to_string());
            }
            if !path.is_empty() {
                debug!(entry, prefix = path.len(), "reconnecting through shortest prefix");
            }

            let mut stack: Vec<&str> = vec![entry];
            let mut extended = false;

            while let Some(&top) = stack.last() {
                let next = if path.len() < bound {
                    system.state(top).and_then(|state| {
                        state
                            .transitions
                            .iter()
                            .find(|t| !covered.covers(top, &t.action, &t.target))
                    })
                } else {
                    None
                };

                match next {
                    Some(transition) => {
                        covered.insert(Edge::new(top, &transition.action, &transition.target));
                        path.push(transition.action.clone());
                        stack.push(transition.target.as_str());
                        extended = true;
                    }
                    None => {
                        if extended {
                            sequences.push(TestSequence::new(path.clone()));
                            extended = false;
                        }
                        stack.pop();
                        if !stack.is_empty() {
                            path.pop();
                        }
                    }
                }
            }
        }

        let suite = TestSuite::new(sequences);
        let report = coverage_report(system, &covered, &distances);
        let mut warnings: Vec<Warning> = report
            .unreachable_states
            .iter()
            .map(|state_id| Warning::UnreachableState {
                state_id: state_id.clone(),
            })
            .collect();
        for edge in &report.uncovered_transitions {
            if distances.depth.contains_key(edge.source.as_str()) {
                warn!(%edge, bound, "transition not covered within path length bound");
                warnings.push(Warning::UncoveredTransition { edge: edge.clone() });
            }
        }

        info!(
            sequences = suite.len(),
            actions = suite.total_actions(),
            covered = report.covered_transitions,
            total = report.total_transitions,
            "generated test suite"
        );

        Generation {
            suite,
            covered,
            report,
            warnings,
        }
    }
}

fn coverage_report(
    system: &TransitionSystem,
    covered: &CoverageSet,
    distances: &Distances<'_>,
) -> CoverageReport {
    let mut visited_states = BTreeSet::from([system.start().to_string()]);
    let mut covered_transitions = 0;
    let mut uncovered_transitions = Vec::new();

    for edge in system.edges() {
        if covered.contains(&edge) {
            covered_transitions += 1;
            visited_states.insert(edge.source.clone());
            visited_states.insert(edge.target.clone());
        } else {
            uncovered_transitions.push(edge);
        }
    }

    let unreachable_states = system
        .state_ids()
        .filter(|id| !distances.depth.contains_key(id))
        .map(str::to_string)
        .collect();

    CoverageReport {
        total_states: system.state_count(),
        total_transitions: system.transition_count(),
        covered_transitions,
        visited_states,
        unreachable_states,
        uncovered_transitions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robot() -> TransitionSystem {
        TransitionSystem::builder("state0")
            .transition("state0", "map", "state1")
            .transition("state0", "liDet", "state2")
            .transition("state0", "caDet", "state2")
            .transition("state0", "move", "state3")
            .transition("state1", "liDet", "state2")
            .transition("state1", "caDet", "state2")
            .transition("state1", "move", "state3")
            .transition("state2", "goAround", "state2")
            .transition("state3", "clean", "state4")
            .transition("state4", "charge", "state5")
            .state("state5")
            .build()
            .unwrap()
    }

    fn executes(system: &TransitionSystem, sequence: &TestSequence) -> bool {
        let mut state = system.start();
        for action in &sequence.actions {
            match system.successor(state, action) {
                Some(next) => state = next,
                None => return false,
            }
        }
        true
    }

    #[test]
    fn test_robot_full_coverage() {
        let ts = robot();
        let generation = TestGenerator::default().generate(&ts);

        assert!(generation.report.is_complete());
        assert!(generation.warnings.is_empty());
        assert_eq!(generation.suite.len(), 6);
        assert_eq!(
            generation.suite.sequences[0],
            TestSequence::new(["map", "liDet", "goAround"])
        );
        assert_eq!(
            generation.suite.sequences[2],
            TestSequence::new(["map", "move", "clean", "charge"])
        );
        for sequence in generation.suite.iter() {
            assert!(!sequence.is_empty());
            assert!(executes(&ts, sequence), "{:?} does not execute", sequence);
        }
    }

    #[test]
    fn test_path_length_bound() {
        let ts = TransitionSystem::builder("a")
            .transition("a", "x", "b")
            .transition("b", "y", "c")
            .state("c")
            .build()
            .unwrap();
        let generator = TestGenerator::new(GenerationConfig::default().with_max_path_length(1));
        let generation = generator.generate(&ts);

        assert_eq!(generation.suite.sequences, vec![TestSequence::new(["x"])]);
        assert!(!generation.report.is_complete());
        assert_eq!(generation.report.edge_coverage(), 0.5);
        assert_eq!(
            generation.warnings,
            vec![Warning::UncoveredTransition {
                edge: Edge::new("b", "y", "c")
            }]
        );
    }

    #[test]
    fn test_reconnection_uses_shortest_prefix() {
        // "t" is first entered at the bound, its edge is picked up later
        // through the shorter route a -y-> m -j-> t
        let ts = TransitionSystem::builder("a")
            .transition("a", "x", "p")
            .transition("a", "y", "m")
            .transition("p", "q", "m")
            .transition("m", "j", "t")
            .transition("t", "w", "z")
            .state("z")
            .build()
            .unwrap();
        let generator = TestGenerator::new(GenerationConfig::default().with_max_path_length(3));
        let generation = generator.generate(&ts);

        assert_eq!(
            generation.suite.sequences,
            vec![
                TestSequence::new(["x", "q", "j"]),
                TestSequence::new(["y"]),
                TestSequence::new(["y", "j", "w"]),
            ]
        );
        assert!(generation.report.is_complete());
    }

    #[test]
    fn test_sequences_respect_bound() {
        let ts = TransitionSystem::builder("a")
            .transition("a", "x", "b")
            .transition("b", "y", "c")
            .transition("a", "short", "c")
            .transition("c", "z", "d")
            .state("d")
            .build()
            .unwrap();
        let generator = TestGenerator::new(GenerationConfig::default().with_max_path_length(2));
        let generation = generator.generate(&ts);

        assert!(generation.report.is_complete());
        assert!(generation
            .suite
            .iter()
            .all(|s| s.len() <= 2 && executes(&ts, s)));
    }

    #[test]
    fn test_cycles_terminate() {
        let ts = TransitionSystem::builder("a")
            .transition("a", "x", "b")
            .transition("b", "y", "a")
            .transition("b", "spin", "b")
            .build()
            .unwrap();
        let generation = TestGenerator::default().generate(&ts);
        assert!(generation.report.is_complete());
        assert_eq!(generation.covered.len(), 3);
    }

    #[test]
    fn test_unreachable_state_reported() {
        let ts = TransitionSystem::builder("a")
            .transition("a", "x", "b")
            .transition("orphan", "y", "b")
            .state("b")
            .build()
            .unwrap();
        let generation = TestGenerator::default().generate(&ts);

        assert_eq!(
            generation.warnings,
            vec![Warning::UnreachableState {
                state_id: "orphan".to_string()
            }]
        );
        assert!(generation.report.unreachable_states.contains("orphan"));
        assert!(!generation.report.is_complete());
        assert_eq!(generation.report.state_coverage(), 2.0 / 3.0);
    }

    #[test]
    fn test_generate_with_existing_coverage() {
        let ts = TransitionSystem::builder("a")
            .transition("a", "x", "b")
            .transition("a", "y", "c")
            .state("b")
            .state("c")
            .build()
            .unwrap();
        let mut covered = CoverageSet::new();
        assert!(covered.insert(Edge::new("a", "x", "b")));
        assert!(!covered.insert(Edge::new("a", "x", "b")));

        let generation = TestGenerator::default().generate_with(&ts, covered);
        assert_eq!(generation.suite.sequences, vec![TestSequence::new(["y"])]);
        assert_eq!(generation.covered.len(), 2);
        assert!(generation.report.is_complete());
    }

    #[test]
    fn test_terminal_start_yields_empty_suite() {
        let ts = TransitionSystem::builder("only").state("only").build().unwrap();
        let generation = TestGenerator::default().generate(&ts);
        assert!(generation.suite.is_empty());
        assert!(generation.report.is_complete());
        assert_eq!(generation.report.edge_coverage(), 1.0);
    }
}
