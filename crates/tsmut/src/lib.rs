//! tsmut: mutation analysis for finite transition systems
//!
//! Reads action-labeled transition systems from XML, derives mutants
//! (linearization plus the classic structural operators), generates
//! edge-covering test sequences and decides which mutants the sequences
//! kill.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐   ┌────────────┐
//! │ xml      │──►│ model        │──►│ linearize  │──►│ evaluate   │
//! │ (parse)  │   │ (TS, checks) │   │ mutation   │   │ (verdicts) │
//! └──────────┘   └──────┬───────┘   └────────────┘   └─────▲──────┘
//!                       │           ┌────────────┐         │
//!                       └──────────►│ generate   │─────────┘
//!                                   │ (suite)    │
//!                                   └────────────┘
//! ```
//!
//! ```
//! use tsmut::{linearize, xml, TestSequence, TraceEvaluator, Verdict};
//!
//! let ts = xml::parse(
//!     r#"<ts><start>s</start><states>
//!          <state id="s"><transition action="go" target="t"/></state>
//!          <state id="t"/>
//!        </states></ts>"#,
//! )?;
//! let linear = linearize(&ts)?;
//! let verdict = TraceEvaluator::new(&ts, &linear.system)
//!     .with_renaming(linear.renaming)
//!     .evaluate(&TestSequence::new(["go"]))?;
//! assert_eq!(verdict, Verdict::Survived);
//! # Ok::<(), tsmut::TsError>(())
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

pub mod config;
pub mod engine;
pub mod evaluate;
pub mod generate;
pub mod linearize;
pub mod model;
pub mod mutation;
pub mod result;
pub mod telemetry;
pub mod traces;
pub mod xml;

pub use config::{
    EngineConfig, EvaluationConfig, GenerationConfig, LinearizeConfig, ParseOptions,
    UndeclaredTargets,
};
pub use engine::{EngineReport, ModelSummary, MutationEngine};
pub use evaluate::{
    evaluate_mutant, evaluate_mutants, replay, Replay, SuiteVerdict, TraceEvaluator, Verdict,
};
pub use generate::{
    CoverageReport, CoverageSet, Generation, TestGenerator, TestSequence, TestSuite,
};
pub use linearize::{
    base_label, disambiguate_actions, linearize, unfold, ActionRenaming, Linearization,
    Linearizer, Unfolding,
};
pub use model::analysis::{
    to_dot, AnalysisIssue, AnalysisReport, IssueSeverity, ModelAnalyzer, ReachabilityInfo,
};
pub use model::{Edge, State, Transition, TransitionSystem, TransitionSystemBuilder};
pub use mutation::{
    calculate_mutation_score, ClassScore, Mutant, MutantResult, MutationClass, MutationGenerator,
    MutationScore,
};
pub use result::{TsError, TsResult, Warning};
pub use traces::{collect_traces, collect_traces_with, is_isomorphic, trace_equivalent, Trace};
