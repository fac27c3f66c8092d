//! Property-based tests for tsmut.
//!
//! Random action-deterministic models are built from per-state label and
//! target choices; duplicate labels within a state are dropped before
//! building, so every generated model is valid.

use proptest::prelude::*;
use tsmut::xml;
use tsmut::{
    collect_traces_with, is_isomorphic, linearize, replay, trace_equivalent, ActionRenaming,
    GenerationConfig, TestGenerator, TestSequence, TraceEvaluator, TransitionSystem, Warning,
};

const LABELS: [&str; 4] = ["a", "b", "c", "d"];

/// Model with `n` states `s0..s{n-1}` rooted at `s0`.
fn arb_system() -> impl Strategy<Value = TransitionSystem> {
    (1usize..6).prop_flat_map(|n| {
        prop::collection::vec(
            prop::collection::vec((0..LABELS.len(), 0..n), 0..4),
            n,
        )
        .prop_map(move |states| {
            let mut builder = TransitionSystem::builder("s0");
            for (idx, transitions) in states.iter().enumerate() {
                let source = format!("s{}", idx);
                builder = builder.state(&source);
                let mut used = Vec::new();
                for (label, target) in transitions {
                    if used.contains(label) {
                        continue;
                    }
                    used.push(*label);
                    builder = builder.transition(&source, LABELS[*label], format!("s{}", target));
                }
            }
            builder.build().expect("generated model is valid")
        })
    })
}

fn arb_sequence() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(LABELS.to_vec()), 1..6)
        .prop_map(|labels| labels.into_iter().map(str::to_string).collect())
}

proptest! {
    /// Every transition target resolves and the start exists.
    #[test]
    fn prop_closure_invariant(ts in arb_system()) {
        prop_assert!(ts.contains(ts.start()));
        for edge in ts.edges() {
            prop_assert!(ts.contains(&edge.target), "dangling {}", edge);
        }
    }

    /// Writing and reading back yields an isomorphic model.
    #[test]
    fn prop_xml_round_trip(ts in arb_system()) {
        let reparsed = xml::parse(&xml::to_xml(&ts)).expect("writer output parses");
        prop_assert!(is_isomorphic(&ts, &reparsed));
        prop_assert_eq!(reparsed, ts);
    }

    /// Linearization preserves the reachable action language modulo suffixes.
    #[test]
    fn prop_linearization_preserves_language(ts in arb_system()) {
        let result = linearize(&ts).expect("small models stay under the limit");
        let before = collect_traces_with(&ts, 5, &ActionRenaming::new());
        let after = collect_traces_with(&result.system, 5, &result.renaming);
        prop_assert_eq!(before, after);
        prop_assert!(trace_equivalent(&ts, &result.system, 5, &result.renaming));
    }

    /// Every linearized transition mirrors a transition of its origin state.
    #[test]
    fn prop_linearization_maps_onto_origins(ts in arb_system()) {
        let result = linearize(&ts).expect("small models stay under the limit");
        let root = result.origins.get(result.system.start()).map(String::as_str);
        prop_assert_eq!(root, Some(ts.start()));
        for edge in result.system.edges() {
            let source = &result.origins[&edge.source];
            let target = &result.origins[&edge.target];
            let action = result.renaming.original(&edge.action);
            prop_assert_eq!(ts.successor(source, action), Some(target.as_str()));
        }
    }

    /// Generation terminates and accounts for every reachable transition.
    #[test]
    fn prop_generator_covers_or_reports(ts in arb_system(), bound in 1usize..6) {
        let config = GenerationConfig::default().with_max_path_length(bound);
        let generation = TestGenerator::new(config).generate(&ts);
        let reachable = ts.reachable_states();

        for sequence in generation.suite.iter() {
            prop_assert!(!sequence.is_empty());
            prop_assert!(sequence.len() <= bound);
            let outcome = replay(&ts, sequence, &ActionRenaming::new()).unwrap();
            prop_assert!(outcome.is_completed());
        }

        for edge in ts.edges().filter(|e| reachable.contains(&e.source)) {
            let covered = generation.covered.contains(&edge);
            let reported = generation
                .warnings
                .contains(&Warning::UncoveredTransition { edge: edge.clone() });
            prop_assert!(covered != reported, "{} covered={} reported={}", edge, covered, reported);
        }
    }

    /// Replaying the same inputs always yields the same verdict.
    #[test]
    fn prop_evaluator_determinism(
        original in arb_system(),
        mutant in arb_system(),
        actions in arb_sequence(),
    ) {
        let sequence = TestSequence::new(actions);
        let evaluator = TraceEvaluator::new(&original, &mutant);
        let first = evaluator.evaluate(&sequence).unwrap();
        let second = evaluator.evaluate(&sequence).unwrap();
        prop_assert_eq!(first, second);
    }

    /// A model never kills itself.
    #[test]
    fn prop_self_evaluation_survives(ts in arb_system(), actions in arb_sequence()) {
        let verdict = TraceEvaluator::new(&ts, &ts)
            .evaluate(&TestSequence::new(actions))
            .unwrap();
        prop_assert!(!verdict.is_killed());
    }
}
