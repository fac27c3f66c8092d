//! In-memory transition system model.
//!
//! A [`TransitionSystem`] is a closed, action-deterministic graph with a single
//! start state. Instances are only produced through [`TransitionSystemBuilder`],
//! which enforces the model invariants, and are immutable afterwards:
//! transformations always build a new instance.

pub mod analysis;

use crate::result::{TsError, TsResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

/// Labeled transition owned by its source state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Transition {
    /// Action label
    pub action: String,
    /// Target state identifier
    pub target: String,
}

impl Transition {
    /// Create a new transition
    #[must_use]
    pub fn new(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
        }
    }
}

/// State with its outgoing transitions in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// State identifier (unique within a model)
    pub id: String,
    /// Outgoing transitions
    pub transitions: Vec<Transition>,
}

impl State {
    /// Create a state without transitions
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transitions: Vec::new(),
        }
    }

    /// Whether the state has no outgoing transitions
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Outgoing transition labeled `action`
    #[must_use]
    pub fn transition(&self, action: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.action == action)
    }

    /// Outgoing action labels in declaration order
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.transitions.iter().map(|t| t.action.as_str())
    }
}

/// Globally identifying view of a transition.
///
/// `(source, action)` is already unique in a valid model; `target` is kept for
/// reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    /// Source state
    pub source: String,
    /// Action label
    pub action: String,
    /// Target state
    pub target: String,
}

impl Edge {
    /// Create a new edge
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        action: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            action: action.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> {}", self.source, self.action, self.target)
    }
}

/// Validated, immutable transition system.
///
/// Deserialization runs the same checks as the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SystemData")]
pub struct TransitionSystem {
    start: String,
    states: BTreeMap<String, State>,
}

/// Unchecked serialized form of [`TransitionSystem`].
#[derive(Deserialize)]
struct SystemData {
    start: String,
    states: BTreeMap<String, State>,
}

impl TryFrom<SystemData> for TransitionSystem {
    type Error = TsError;

    fn try_from(data: SystemData) -> TsResult<Self> {
        let mut builder = TransitionSystemBuilder::new(data.start);
        for (key, state) in data.states {
            if key != state.id {
                return Err(TsError::malformed(format!(
                    "state keyed '{}' carries id '{}'",
                    key, state.id
                )));
            }
            builder = builder.state(&state.id);
            for transition in state.transitions {
                builder = builder.transition(&state.id, transition.action, transition.target);
            }
        }
        builder.build()
    }
}

impl TransitionSystem {
    /// Start building a model rooted at `start`.
    #[must_use]
    pub fn builder(start: impl Into<String>) -> TransitionSystemBuilder {
        TransitionSystemBuilder::new(start)
    }

    /// Start state identifier
    #[must_use]
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Look up a state by identifier
    #[must_use]
    pub fn state(&self, id: &str) -> Option<&State> {
        self.states.get(id)
    }

    /// Whether a state with this identifier exists
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    /// All states, sorted by identifier
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    /// All state identifiers, sorted
    pub fn state_ids(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Number of states
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Number of transitions
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.states.values().map(|s| s.transitions.len()).sum()
    }

    /// All transitions as edges, grouped by source state
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.states.values().flat_map(|state| {
            state
                .transitions
                .iter()
                .map(move |t| Edge::new(&state.id, &t.action, &t.target))
        })
    }

    /// Target reached from `state` via `action`, if enabled
    #[must_use]
    pub fn successor(&self, state: &str, action: &str) -> Option<&str> {
        self.states
            .get(state)
            .and_then(|s| s.transition(action))
            .map(|t| t.target.as_str())
    }

    /// Action alphabet of the model
    #[must_use]
    pub fn actions(&self) -> BTreeSet<&str> {
        self.states.values().flat_map(State::actions).collect()
    }

    /// Whether `id` is a terminal state. Unknown states are not terminal.
    #[must_use]
    pub fn is_terminal(&self, id: &str) -> bool {
        self.states.get(id).is_some_and(State::is_terminal)
    }

    /// States reachable from the start state (start included), via BFS.
    #[must_use]
    pub fn reachable_states(&self) -> BTreeSet<String> {
        let mut reachable = BTreeSet::new();
        let mut queue = VecDeque::new();

        reachable.insert(self.start.clone());
        queue.push_back(self.start.as_str());

        while let Some(current) = queue.pop_front() {
            let Some(state) = self.states.get(current) else {
                continue;
            };
            for transition in &state.transitions {
                if reachable.insert(transition.target.clone()) {
                    queue.push_back(transition.target.as_str());
                }
            }
        }

        reachable
    }
}

/// Builder enforcing the model invariants on [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct TransitionSystemBuilder {
    start: String,
    states: Vec<State>,
    index: HashMap<String, usize>,
}

impl TransitionSystemBuilder {
    /// Create a builder for a model rooted at `start`
    #[must_use]
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            states: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Declare a state. Declaring an existing state is a no-op.
    #[must_use]
    pub fn state(mut self, id: impl Into<String>) -> Self {
        self.slot(id.into());
        self
    }

    /// Add a transition; the source state is declared implicitly.
    #[must_use]
    pub fn transition(
        mut self,
        source: impl Into<String>,
        action: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let slot = self.slot(source.into());
        self.states[slot]
            .transitions
            .push(Transition::new(action, target));
        self
    }

    /// Whether a state has been declared
    #[must_use]
    pub fn has_state(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Declare every transition target that is not yet a state.
    ///
    /// Returns the identifiers that were added, in first-reference order.
    #[must_use]
    pub fn declare_missing_targets(mut self) -> (Self, Vec<String>) {
        let missing: Vec<String> = {
            let mut seen = HashSet::new();
            self.states
                .iter()
                .flat_map(|s| s.transitions.iter())
                .filter(|t| !self.index.contains_key(&t.target))
                .filter(|t| seen.insert(t.target.clone()))
                .map(|t| t.target.clone())
                .collect()
        };
        for id in &missing {
            self.slot(id.clone());
        }
        (self, missing)
    }

    /// Validate and freeze the model.
    ///
    /// # Errors
    /// `DuplicateAction`, `DanglingTransition` or `UnknownStart` when the
    /// corresponding invariant is violated.
    pub fn build(self) -> TsResult<TransitionSystem> {
        for state in &self.states {
            let mut seen = HashSet::new();
            for transition in &state.transitions {
                if !seen.insert(transition.action.as_str()) {
                    return Err(TsError::DuplicateAction {
                        state_id: state.id.clone(),
                        action: transition.action.clone(),
                    });
                }
            }
        }

        for state in &self.states {
            for transition in &state.transitions {
                if !self.index.contains_key(&transition.target) {
                    return Err(TsError::DanglingTransition {
                        state_id: state.id.clone(),
                        action: transition.action.clone(),
                        target: transition.target.clone(),
                    });
                }
            }
        }

        if !self.index.contains_key(&self.start) {
            return Err(TsError::UnknownStart { start: self.start });
        }

        let states = self
            .states
            .into_iter()
            .map(|state| (state.id.clone(), state))
            .collect();

        Ok(TransitionSystem {
            start: self.start,
            states,
        })
    }

    fn slot(&mut self, id: String) -> usize {
        if let Some(&slot) = self.index.get(&id) {
            return slot;
        }
        let slot = self.states.len();
        self.states.push(State::new(id.clone()));
        self.index.insert(id, slot);
        slot
    }
}
