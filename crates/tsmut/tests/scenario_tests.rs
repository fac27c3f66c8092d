//! End-to-end tests over the robot fixtures.

use std::io::Write;
use std::path::PathBuf;
use tsmut::xml;
use tsmut::{
    is_isomorphic, linearize, replay, trace_equivalent, ActionRenaming, EngineConfig,
    MutationClass, MutationEngine, ParseOptions, Replay, TestGenerator, TestSequence,
    TraceEvaluator, TransitionSystem, TsError, Verdict,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(name: &str, options: ParseOptions) -> TransitionSystem {
    xml::from_file(fixture(name), options).expect("fixture parses")
}

// === Parsing ===

#[test]
fn test_robot_references_undeclared_state() {
    let result = xml::from_file(fixture("robot.ts"), ParseOptions::strict());
    assert!(matches!(
        result,
        Err(TsError::DanglingTransition { state_id, target, .. })
            if state_id == "state4" && target == "state5"
    ));
}

#[test]
fn test_robot_lenient_materializes_terminal_state() {
    let robot = load("robot.ts", ParseOptions::lenient());
    assert_eq!(robot.state_count(), 6);
    assert!(robot.is_terminal("state5"));
    assert_eq!(robot.transition_count(), 10);
}

#[test]
fn test_duplicate_action_fixture() {
    let result = xml::from_file(fixture("duplicate-action.ts"), ParseOptions::lenient());
    assert!(matches!(
        result,
        Err(TsError::DuplicateAction { state_id, action })
            if state_id == "state0" && action == "map"
    ));
}

#[test]
fn test_dangling_target_fixture() {
    let result = xml::from_file(fixture("dangling-target.ts"), ParseOptions::strict());
    assert!(matches!(
        result,
        Err(TsError::DanglingTransition { target, .. }) if target == "state9"
    ));
}

#[test]
fn test_from_file_in_temp_dir() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"<ts><start>a</start><states><state id="a"><transition action="x" target="a"/></state></states></ts>"#
    )
    .expect("write");

    let ts = xml::from_file(file.path(), ParseOptions::strict()).expect("parses");
    assert_eq!(ts.successor("a", "x"), Some("a"));
}

#[test]
fn test_from_file_missing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = xml::from_file(dir.path().join("absent.ts"), ParseOptions::strict());
    assert!(matches!(result, Err(TsError::Io(_))));
}

#[test]
fn test_writer_round_trip_of_fixture() {
    let robot = load("robot.ts", ParseOptions::lenient());
    let reparsed = xml::parse(&xml::to_xml(&robot)).expect("writer output parses");
    assert!(is_isomorphic(&robot, &reparsed));
    assert_eq!(robot, reparsed);
}

// === Scenario A: execution on the original model ===

#[test]
fn test_robot_sequence_executes() {
    let robot = load("robot.ts", ParseOptions::lenient());
    let outcome = replay(
        &robot,
        &TestSequence::new(["map", "move", "clean", "charge"]),
        &ActionRenaming::new(),
    )
    .unwrap();
    assert_eq!(
        outcome,
        Replay::Completed {
            final_state: "state5".to_string()
        }
    );
}

// === Scenario B: context suffixes ===

#[test]
fn test_robot_linear_sequences() {
    let linear = load("robot-linear.ts", ParseOptions::lenient());

    let completed = replay(
        &linear,
        &TestSequence::new(["move_1", "clean", "charge"]),
        &ActionRenaming::new(),
    )
    .unwrap();
    assert!(completed.is_completed());

    let blocked = replay(
        &linear,
        &TestSequence::new(["move_0", "clean", "charge"]),
        &ActionRenaming::new(),
    )
    .unwrap();
    assert_eq!(
        blocked,
        Replay::Blocked {
            step: 0,
            state: "state0".to_string(),
            action: "move_0".to_string()
        }
    );
}

#[test]
fn test_labeling_variants_kill_each_other() {
    let linear = load("robot-linear.ts", ParseOptions::lenient());
    let robot = load("robot.ts", ParseOptions::lenient());

    let verdict = TraceEvaluator::new(&linear, &robot)
        .evaluate(&TestSequence::new(["move_1", "clean", "charge"]))
        .unwrap();
    assert!(matches!(verdict, Verdict::Killed { step: 0, .. }));
}

#[test]
fn test_suffix_stripping_exposes_structural_difference() {
    let linear = load("robot-linear.ts", ParseOptions::lenient());
    let robot = load("robot.ts", ParseOptions::lenient());
    let renaming = ActionRenaming::strip_context_suffixes(&linear);

    let evaluator = TraceEvaluator::new(&robot, &linear).with_renaming(renaming);
    let same = evaluator
        .evaluate(&TestSequence::new(["map", "move", "clean", "charge"]))
        .unwrap();
    assert_eq!(same, Verdict::Survived);

    let diverging = evaluator
        .evaluate(&TestSequence::new(["liDet", "goAround", "clean"]))
        .unwrap();
    assert!(matches!(diverging, Verdict::Killed { step: 2, .. }));
}

// === Linearization acceptance ===

#[test]
fn test_linearizing_robot_linear_gives_new_linear() {
    let linear = load("robot-linear.ts", ParseOptions::lenient());
    let expected = load("new-linear.ts", ParseOptions::strict());

    let result = linearize(&linear).unwrap();
    assert_eq!(result.system.state_count(), 24);
    assert_eq!(result.system.start(), expected.start());
    assert!(result.renaming.is_empty());
    assert!(is_isomorphic(&result.system, &expected));
}

#[test]
fn test_linearizing_robot_preserves_language() {
    let robot = load("robot.ts", ParseOptions::lenient());
    let result = linearize(&robot).unwrap();

    assert!(result.system.actions().contains("move_0"));
    assert!(result.system.actions().contains("move_1"));
    assert!(trace_equivalent(&robot, &result.system, 6, &result.renaming));
    assert!(result
        .origins
        .values()
        .all(|origin| robot.contains(origin)));
}

// === Generation over fixtures ===

#[test]
fn test_generated_suite_covers_robot() {
    let robot = load("robot.ts", ParseOptions::lenient());
    let generation = TestGenerator::default().generate(&robot);

    assert!(generation.report.is_complete());
    for sequence in generation.suite.iter() {
        let outcome = replay(&robot, sequence, &ActionRenaming::new()).unwrap();
        assert!(outcome.is_completed());
    }
}

// === Engine ===

#[test]
fn test_engine_on_robot_document() {
    let xml = std::fs::read_to_string(fixture("robot.ts")).unwrap();
    let config = EngineConfig::from_yaml(
        "parse:\n  undeclared_targets: materialize\nevaluation:\n  parallel_jobs: 2\n",
    )
    .unwrap();
    let report = MutationEngine::new(config).unwrap().analyze_document(&xml).unwrap();

    assert_eq!(report.model.states, 6);
    assert!(report.coverage.is_complete());
    assert_eq!(report.score.total_mutants, report.results.len());
    // suffixed labels replay as their unsuffixed originals
    let linearization = report
        .results
        .iter()
        .find(|r| r.class == MutationClass::Linearization)
        .expect("linearization mutant");
    assert!(!linearization.killed);
    assert!(linearization.equivalent);
    assert!(report.survivors().any(|r| r.class == MutationClass::Linearization));
    assert_eq!(
        report.score.by_class[&MutationClass::Linearization].killed,
        0
    );
    // every state removal cuts off a covered transition
    assert_eq!(
        report.score.by_class[&MutationClass::StateRemoval].score,
        1.0
    );
}
