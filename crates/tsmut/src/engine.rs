//! End-to-end pipeline.
//!
//! Document → model → analysis → covering suite → mutants → verdicts.

use crate::config::EngineConfig;
use crate::evaluate::evaluate_mutants;
use crate::generate::{CoverageReport, TestGenerator, TestSuite};
use crate::model::analysis::{AnalysisReport, ModelAnalyzer};
use crate::model::TransitionSystem;
use crate::mutation::{calculate_mutation_score, MutantResult, MutationGenerator, MutationScore};
use crate::result::{TsResult, Warning};
use crate::xml;
use serde::Serialize;
use tracing::info;

/// Structural facts about the analysed model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    /// Start state id
    pub start: String,
    /// Declared states
    pub states: usize,
    /// Declared transitions
    pub transitions: usize,
    /// States reachable from the start
    pub reachable_states: usize,
    /// States without outgoing transitions
    pub terminal_states: usize,
    /// States with more than one incoming transition
    pub merge_points: usize,
    /// Transitions back into their own source
    pub self_loops: usize,
    /// Whether the reachable part is a tree
    pub is_linear: bool,
}

impl ModelSummary {
    fn new(system: &TransitionSystem, report: &AnalysisReport) -> Self {
        Self {
            start: system.start().to_string(),
            states: system.state_count(),
            transitions: system.transition_count(),
            reachable_states: report.reachability.reachable_states.len(),
            terminal_states: report.terminal_states.len(),
            merge_points: report.merge_points.len(),
            self_loops: report.self_loops.len(),
            is_linear: report.is_linear,
        }
    }
}

/// Everything one engine run produces.
#[derive(Debug, Clone, Serialize)]
pub struct EngineReport {
    /// Summary of the input model
    pub model: ModelSummary,
    /// Generated test suite
    pub suite: TestSuite,
    /// Coverage of the suite over the input model
    pub coverage: CoverageReport,
    /// Per-mutant results
    pub results: Vec<MutantResult>,
    /// Aggregate score
    pub score: MutationScore,
    /// Warnings from every stage
    pub warnings: Vec<Warning>,
}

impl EngineReport {
    /// Serialize report to JSON.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> TsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Results of mutants no sequence killed
    pub fn survivors(&self) -> impl Iterator<Item = &MutantResult> {
        self.results.iter().filter(|r| !r.killed)
    }
}

/// Mutation analysis pipeline.
#[derive(Debug, Clone, Default)]
pub struct MutationEngine {
    config: EngineConfig,
}

impl MutationEngine {
    /// Create an engine after validating `config`.
    ///
    /// # Errors
    /// `InvalidConfig` if a value is out of range.
    pub fn new(config: EngineConfig) -> TsResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse `xml` with the configured options and analyse it.
    ///
    /// # Errors
    /// Any parse error, or an evaluation error from [`Self::analyze`].
    pub fn analyze_document(&self, xml: &str) -> TsResult<EngineReport> {
        let system = xml::parse_with(xml, self.config.parse)?;
        self.analyze(&system)
    }

    /// Run the pipeline on an already built model.
    ///
    /// # Errors
    /// `InvalidConfig` if the worker pool cannot be created.
    pub fn analyze(&self, system: &TransitionSystem) -> TsResult<EngineReport> {
        let analysis = ModelAnalyzer::new(system).analyze();
        let model = ModelSummary::new(system, &analysis);

        let generation = TestGenerator::new(self.config.generation).generate(system);

        let mutants = MutationGenerator::new(system)
            .with_linearize_config(self.config.linearize.clone())
            .generate_classes(&self.config.evaluation.mutation_classes);

        let mut warnings = generation.warnings;
        for warning in mutants.iter().flat_map(|m| &m.warnings) {
            if !warnings.contains(warning) {
                warnings.push(warning.clone());
            }
        }

        let results = evaluate_mutants(system, &mutants, &generation.suite, &self.config.evaluation)?;
        let score = calculate_mutation_score(&results);

        info!(
            states = model.states,
            sequences = generation.suite.len(),
            mutants = score.total_mutants,
            killed = score.killed,
            score = score.score,
            "mutation analysis complete"
        );

        Ok(EngineReport {
            model,
            suite: generation.suite,
            coverage: generation.report,
            results,
            score,
            warnings,
        })
    }
}
