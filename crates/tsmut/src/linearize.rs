//! Linearization: the history-splitting mutation operator.
//!
//! A linearized model gives every state a single incoming history. The
//! transformation runs in three passes over an immutable input:
//!
//! 1. states unreachable from the start are pruned (reported, not fatal);
//! 2. action labels shared by several transitions get a context index
//!    (`move` becomes `move_0`, `move_1`), numbered in depth-first pre-order;
//! 3. the model is unfolded into a tree of per-path copies and renumbered
//!    breadth-first from 1 (`State_1` is the start).
//!
//! Cycles cannot unfold finitely. Once a path holds `max_unroll` copies of a
//! state, the next transition into it returns to the most recent copy on the
//! path, so the action language is preserved exactly. The start state is
//! never copied.

use crate::config::LinearizeConfig;
use crate::model::TransitionSystem;
use crate::result::{TsError, TsResult, Warning};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

#[allow(clippy::expect_used)]
fn context_suffix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.+)_(\d+)$").expect("context suffix pattern is valid")
    })
}

/// Label with its context index removed (`move_1` -> `move`).
///
/// Labels without a numeric suffix are returned unchanged.
pub fn base_label(label: &str) -> &str {
    context_suffix()
        .captures(label)
        .and_then(|caps| caps.get(1))
        .map_or(label, |base| base.as_str())
}

/// Mapping from context-suffixed labels back to the labels they replace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionRenaming {
    map: BTreeMap<String, String>,
}

impl ActionRenaming {
    /// Empty renaming (every label maps to itself)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `renamed` stands for `original`.
    pub fn insert(&mut self, renamed: impl Into<String>, original: impl Into<String>) {
        self.map.insert(renamed.into(), original.into());
    }

    /// Original label of `action`
    #[must_use]
    pub fn original<'a>(&'a self, action: &'a str) -> &'a str {
        self.map.get(action).map_or(action, String::as_str)
    }

    /// Number of renamed labels
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no label is renamed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate `(renamed, original)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renaming that strips numeric context suffixes from every label of
    /// `system` that carries one.
    ///
    /// Useful when a model was linearized elsewhere and only the labels are
    /// available. A label such as `step_2` that is genuinely part of the
    /// vocabulary is stripped too.
    #[must_use]
    pub fn strip_context_suffixes(system: &TransitionSystem) -> Self {
        let mut renaming = Self::new();
        for action in system.actions() {
            let base = base_label(action);
            if base != action {
                renaming.insert(action, base);
            }
        }
        renaming
    }
}

/// Output of [`Linearizer::linearize`].
#[derive(Debug, Clone, Serialize)]
pub struct Linearization {
    /// Linearized model
    pub system: TransitionSystem,
    /// Suffixed label -> original label
    pub renaming: ActionRenaming,
    /// New state identifier -> original state identifier
    pub origins: BTreeMap<String, String>,
    /// Pruned states
    pub warnings: Vec<Warning>,
}

/// Output of [`unfold`].
#[derive(Debug, Clone)]
pub struct Unfolding {
    /// Unfolded model
    pub system: TransitionSystem,
    /// New state identifier -> original state identifier
    pub origins: BTreeMap<String, String>,
}

/// Linearization transformer.
#[derive(Debug, Clone, Default)]
pub struct Linearizer {
    config: LinearizeConfig,
}

impl Linearizer {
    /// Create a linearizer with the given bounds.
    pub fn new(config: LinearizeConfig) -> Self {
        Self { config }
    }

    /// Prune, disambiguate and unfold `system` into a new model.
    ///
    /// # Errors
    /// `StateLimitExceeded` if the unfolding outgrows `max_states`.
    pub fn linearize(&self, system: &TransitionSystem) -> TsResult<Linearization> {
        let reachable = system.reachable_states();
        let warnings: Vec<Warning> = system
            .state_ids()
            .filter(|id| !reachable.contains(*id))
            .map(|id| {
                warn!(state = id, "pruning state unreachable from start");
                Warning::UnreachableState {
                    state_id: id.to_string(),
                }
            })
            .collect();

        let pruned = restrict(system, &reachable)?;
        let (disambiguated, renaming) = disambiguate_actions(&pruned)?;
        let unfolding = unfold(&disambiguated, &self.config)?;

        info!(
            original_states = system.state_count(),
            linearized_states = unfolding.system.state_count(),
            renamed_actions = renaming.len(),
            pruned = warnings.len(),
            "linearized transition system"
        );

        Ok(Linearization {
            system: unfolding.system,
            renaming,
            origins: unfolding.origins,
            warnings,
        })
    }
}

/// Linearize with default bounds.
///
/// # Errors
/// See [`Linearizer::linearize`].
pub fn linearize(system: &TransitionSystem) -> TsResult<Linearization> {
    Linearizer::default().linearize(system)
}

/// Copy of `system` restricted to the states in `keep`.
fn restrict(system: &TransitionSystem, keep: &BTreeSet<String>) -> TsResult<TransitionSystem> {
    let mut builder = TransitionSystem::builder(system.start());
    for state in system.states().filter(|s| keep.contains(&s.id)) {
        builder = builder.state(&state.id);
        for transition in &state.transitions {
            builder = builder.transition(&state.id, &transition.action, &transition.target);
        }
    }
    builder.build()
}

/// Give every action label that labels more than one transition a context
/// index.
///
/// Indices are assigned per label in depth-first pre-order from the start
/// state, following each state's transitions in declaration order; states
/// the start cannot reach are visited afterwards in identifier order. A
/// suffixed label never collides with a label already in the alphabet.
///
/// # Errors
/// Only if the relabeled model violates an invariant, which a valid input
/// cannot cause.
pub fn disambiguate_actions(
    system: &TransitionSystem,
) -> TsResult<(TransitionSystem, ActionRenaming)> {
    let mut uses: HashMap<&str, usize> = HashMap::new();
    for state in system.states() {
        for transition in &state.transitions {
            *uses.entry(transition.action.as_str()).or_default() += 1;
        }
    }

    let alphabet: HashSet<&str> = uses.keys().copied().collect();
    let mut next_index: HashMap<&str, usize> = HashMap::new();
    let mut labels: HashMap<(&str, &str), String> = HashMap::new();
    let mut renaming = ActionRenaming::new();

    let roots = std::iter::once(system.start()).chain(system.state_ids());
    let mut visited: HashSet<&str> = HashSet::new();

    for root in roots {
        if !visited.insert(root) {
            continue;
        }
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let (state_id, idx) = *frame;
            let Some(transition) = system
                .state(state_id)
                .and_then(|s| s.transitions.get(idx))
            else {
                stack.pop();
                continue;
            };
            frame.1 += 1;

            let action = transition.action.as_str();
            if uses.get(action).copied().unwrap_or(0) > 1 {
                let counter = next_index.entry(action).or_insert(0);
                let mut label = format!("{}_{}", action, counter);
                while alphabet.contains(label.as_str()) {
                    *counter += 1;
                    label = format!("{}_{}", action, counter);
                }
                *counter += 1;
                renaming.insert(label.clone(), action);
                labels.insert((state_id, action), label);
            }

            let target = transition.target.as_str();
            if visited.insert(target) {
                stack.push((target, 0));
            }
        }
    }

    let mut builder = TransitionSystem::builder(system.start());
    for state in system.states() {
        builder = builder.state(&state.id);
        for transition in &state.transitions {
            let action = labels
                .get(&(state.id.as_str(), transition.action.as_str()))
                .cloned()
                .unwrap_or_else(|| transition.action.clone());
            builder = builder.transition(&state.id, action, &transition.target);
        }
    }

    debug!(renamed = renaming.len(), "disambiguated action labels");
    Ok((builder.build()?, renaming))
}

struct PathCopy<'a> {
    origin: &'a str,
    parent: Option<usize>,
    transitions: Vec<(&'a str, usize)>,
}

/// Unfold `system` into per-path copies of its states.
///
/// # Errors
/// `StateLimitExceeded` when more than `config.max_states` copies would be
/// created.
pub fn unfold(system: &TransitionSystem, config: &LinearizeConfig) -> TsResult<Unfolding> {
    let max_unroll = config.max_unroll.max(1);
    let mut copies: Vec<PathCopy<'_>> = vec![PathCopy {
        origin: system.start(),
        parent: None,
        transitions: Vec::new(),
    }];
    let mut queue = VecDeque::from([0usize]);

    while let Some(current) = queue.pop_front() {
        let Some(state) = system.state(copies[current].origin) else {
            continue;
        };

        for transition in &state.transitions {
            let target = transition.target.as_str();
            let next = if target == system.start() {
                0
            } else if let Some(existing) = closing_copy(&copies, current, target, max_unroll) {
                existing
            } else {
                if copies.len() >= config.max_states {
                    return Err(TsError::StateLimitExceeded {
                        limit: config.max_states,
                    });
                }
                copies.push(PathCopy {
                    origin: target,
                    parent: Some(current),
                    transitions: Vec::new(),
                });
                queue.push_back(copies.len() - 1);
                copies.len() - 1
            };
            copies[current]
                .transitions
                .push((transition.action.as_str(), next));
        }
    }

    let name = |index: usize| format!("{}{}", config.state_prefix, index + 1);
    let mut builder = TransitionSystem::builder(name(0));
    let mut origins = BTreeMap::new();
    for (index, copy) in copies.iter().enumerate() {
        builder = builder.state(name(index));
        origins.insert(name(index), copy.origin.to_string());
        for (action, target) in &copy.transitions {
            builder = builder.transition(name(index), *action, name(*target));
        }
    }

    Ok(Unfolding {
        system: builder.build()?,
        origins,
    })
}

/// Copy to loop back to when the path to `current` already holds
/// `max_unroll` copies of `target`.
fn closing_copy(
    copies: &[PathCopy<'_>],
    current: usize,
    target: &str,
    max_unroll: usize,
) -> Option<usize> {
    let mut occurrences = 0;
    let mut most_recent = None;
    let mut cursor = Some(current);
    while let Some(index) = cursor {
        if copies[index].origin == target {
            occurrences += 1;
            most_recent.get_or_insert(index);
        }
        cursor = copies[index].parent;
    }
    if occurrences >= max_unroll {
        most_recent
    } else {
        None
    }
}
