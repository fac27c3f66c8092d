//! Trace sets and structural equivalence.

use crate::linearize::ActionRenaming;
use crate::model::TransitionSystem;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Action sequence executable from the start state.
pub type Trace = Vec<String>;

/// Every trace of length at most `max_len`, the empty trace included.
#[must_use]
pub fn collect_traces(system: &TransitionSystem, max_len: usize) -> BTreeSet<Trace> {
    collect_traces_with(system, max_len, &ActionRenaming::new())
}

/// Like [`collect_traces`], with each label passed through `renaming`.
#[must_use]
pub fn collect_traces_with(
    system: &TransitionSystem,
    max_len: usize,
    renaming: &ActionRenaming,
) -> BTreeSet<Trace> {
    let mut traces = BTreeSet::new();
    let mut stack: Vec<(&str, Trace)> = vec![(system.start(), Vec::new())];

    while let Some((state_id, trace)) = stack.pop() {
        if trace.len() < max_len {
            if let Some(state) = system.state(state_id) {
                for transition in &state.transitions {
                    let mut next = trace.clone();
                    next.push(renaming.original(&transition.action).to_string());
                    stack.push((transition.target.as_str(), next));
                }
            }
        }
        traces.insert(trace);
    }

    traces
}

/// Whether `a` and `b` accept the same traces up to `max_len`, after
/// mapping labels of both through `renaming`.
///
/// Walks pairs of state sets breadth-first, comparing enabled labels. Sets
/// stay singletons unless the renaming merges labels of one state.
#[must_use]
pub fn trace_equivalent(
    a: &TransitionSystem,
    b: &TransitionSystem,
    max_len: usize,
    renaming: &ActionRenaming,
) -> bool {
    let start = (vec![a.start()], vec![b.start()]);
    let mut seen: HashSet<StatePair<'_>> = HashSet::new();
    let mut queue: VecDeque<(StatePair<'_>, usize)> = VecDeque::new();
    seen.insert(start.clone());
    queue.push_back((start, 0));

    // the first visit of a pair has the most remaining depth
    while let Some(((left, right), depth)) = queue.pop_front() {
        if depth >= max_len {
            continue;
        }
        let left_steps = renamed_steps(a, &left, renaming);
        let right_steps = renamed_steps(b, &right, renaming);
        if !left_steps.keys().eq(right_steps.keys()) {
            return false;
        }

        for (label, left_targets) in left_steps {
            let next = (left_targets, right_steps[label].clone());
            if seen.insert(next.clone()) {
                queue.push_back((next, depth + 1));
            }
        }
    }

    true
}

type StatePair<'a> = (Vec<&'a str>, Vec<&'a str>);

/// Enabled renamed labels of a state set, each with its sorted target set.
fn renamed_steps<'a>(
    system: &'a TransitionSystem,
    states: &[&'a str],
    renaming: &'a ActionRenaming,
) -> BTreeMap<&'a str, Vec<&'a str>> {
    let mut steps: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for state in states.iter().filter_map(|id| system.state(id)) {
        for transition in &state.transitions {
            steps
                .entry(renaming.original(&transition.action))
                .or_default()
                .insert(transition.target.as_str());
        }
    }
    steps
        .into_iter()
        .map(|(label, targets)| (label, targets.into_iter().collect()))
        .collect()
}

/// Whether the reachable parts of `a` and `b` are identical up to state
/// names.
///
/// Both models are action-deterministic, so a simultaneous breadth-first
/// walk from the two start states fixes the only candidate bijection.
#[must_use]
pub fn is_isomorphic(a: &TransitionSystem, b: &TransitionSystem) -> bool {
    let mut forward: HashMap<&str, &str> = HashMap::new();
    let mut backward: HashMap<&str, &str> = HashMap::new();
    let mut queue = VecDeque::new();

    forward.insert(a.start(), b.start());
    backward.insert(b.start(), a.start());
    queue.push_back((a.start(), b.start()));

    while let Some((left, right)) = queue.pop_front() {
        let (Some(left_state), Some(right_state)) = (a.state(left), b.state(right)) else {
            return false;
        };
        if left_state.transitions.len() != right_state.transitions.len() {
            return false;
        }

        for transition in &left_state.transitions {
            let Some(right_target) = b.successor(right, &transition.action) else {
                return false;
            };
            let left_target = transition.target.as_str();

            match (forward.get(left_target), backward.get(right_target)) {
                (Some(&mapped), Some(&back)) => {
                    if mapped != right_target || back != left_target {
                        return false;
                    }
                }
                (None, None) => {
                    forward.insert(left_target, right_target);
                    backward.insert(right_target, left_target);
                    queue.push_back((left_target, right_target));
                }
                _ => return false,
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(actions: &[&str]) -> Trace {
        actions.iter().map(|a| a.to_string()).collect()
    }

    fn loop_model() -> TransitionSystem {
        TransitionSystem::builder("a")
            .transition("a", "x", "b")
            .transition("b", "y", "a")
            .transition("b", "z", "c")
            .state("c")
            .build()
            .unwrap()
    }

    #[test]
    fn test_collect_traces_bounded() {
        let traces = collect_traces(&loop_model(), 3);
        let expected: BTreeSet<Trace> = [
            trace(&[]),
            trace(&["x"]),
            trace(&["x", "y"]),
            trace(&["x", "z"]),
            trace(&["x", "y", "x"]),
        ]
        .into_iter()
        .collect();
        assert_eq!(traces, expected);
    }

    #[test]
    fn test_zero_length_only_empty_trace() {
        let traces = collect_traces(&loop_model(), 0);
        assert_eq!(traces.len(), 1);
        assert!(traces.contains(&trace(&[])));
    }

    #[test]
    fn test_trace_equivalence_with_renaming() {
        let plain = TransitionSystem::builder("s")
            .transition("s", "move", "t")
            .state("t")
            .build()
            .unwrap();
        let suffixed = TransitionSystem::builder("q0")
            .transition("q0", "move_3", "q1")
            .state("q1")
            .build()
            .unwrap();

        assert!(!trace_equivalent(&plain, &suffixed, 4, &ActionRenaming::new()));
        let renaming = ActionRenaming::strip_context_suffixes(&suffixed);
        assert!(trace_equivalent(&plain, &suffixed, 4, &renaming));
    }

    #[test]
    fn test_isomorphic_under_renaming_of_states() {
        let renamed = TransitionSystem::builder("p")
            .transition("p", "x", "q")
            .transition("q", "z", "r")
            .transition("q", "y", "p")
            .state("r")
            .build()
            .unwrap();
        assert!(is_isomorphic(&loop_model(), &renamed));
        assert!(is_isomorphic(&renamed, &loop_model()));
    }

    #[test]
    fn test_not_isomorphic_when_merge_differs() {
        // same traces, different shape
        let merged = TransitionSystem::builder("s")
            .transition("s", "a", "m")
            .transition("s", "b", "m")
            .state("m")
            .build()
            .unwrap();
        let split = TransitionSystem::builder("s")
            .transition("s", "a", "m1")
            .transition("s", "b", "m2")
            .state("m1")
            .state("m2")
            .build()
            .unwrap();
        assert!(trace_equivalent(&merged, &split, 5, &ActionRenaming::new()));
        assert!(!is_isomorphic(&merged, &split));
        assert!(!is_isomorphic(&split, &merged));
    }

    #[test]
    fn test_unreachable_part_ignored() {
        let with_orphan = TransitionSystem::builder("p")
            .transition("p", "x", "q")
            .transition("q", "z", "r")
            .transition("q", "y", "p")
            .transition("orphan", "w", "p")
            .state("r")
            .build()
            .unwrap();
        assert!(is_isomorphic(&loop_model(), &with_orphan));
    }

    /// `n` states in a row, each with two labels to the next.
    fn double_chain(n: usize) -> TransitionSystem {
        let mut builder = TransitionSystem::builder("s0");
        for i in 0..n - 1 {
            let (from, to) = (format!("s{}", i), format!("s{}", i + 1));
            builder = builder.transition(&from, "a", &to).transition(&from, "b", &to);
        }
        builder.state(format!("s{}", n - 1)).build().unwrap()
    }

    #[test]
    fn test_trace_equivalence_deep_on_large_model() {
        // 2^39 traces of full length, far too many to list
        let original = double_chain(40);
        let mut builder = TransitionSystem::builder("s0");
        for edge in original.edges() {
            if !(edge.source == "s38" && edge.action == "b") {
                builder = builder.transition(&edge.source, &edge.action, &edge.target);
            }
        }
        let mutant = builder.state("s39").build().unwrap();

        let none = ActionRenaming::new();
        assert!(trace_equivalent(&original, &original, 60, &none));
        assert!(trace_equivalent(&original, &mutant, 38, &none));
        assert!(!trace_equivalent(&original, &mutant, 39, &none));
        assert!(!trace_equivalent(&mutant, &original, 60, &none));
    }

    #[test]
    fn test_trace_equivalence_when_renaming_merges_labels() {
        let split = TransitionSystem::builder("s")
            .transition("s", "go_1", "t")
            .transition("s", "go_2", "u")
            .transition("t", "x", "v")
            .transition("u", "y", "v")
            .state("v")
            .build()
            .unwrap();
        let merged = TransitionSystem::builder("s")
            .transition("s", "go", "m")
            .transition("m", "x", "v")
            .transition("m", "y", "v")
            .state("v")
            .build()
            .unwrap();
        let renaming = ActionRenaming::strip_context_suffixes(&split);

        assert_eq!(
            collect_traces_with(&split, 3, &renaming),
            collect_traces_with(&merged, 3, &renaming)
        );
        assert!(trace_equivalent(&split, &merged, 3, &renaming));
        assert!(trace_equivalent(&merged, &split, 3, &renaming));
    }
}
