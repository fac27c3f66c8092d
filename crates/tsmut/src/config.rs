//! Engine configuration
//!
//! Every stage reads its own section. Sections default sensibly, so a YAML
//! document only needs to name what it overrides:
//!
//! ```yaml
//! parse:
//!   undeclared_targets: materialize
//! generation:
//!   max_path_length: 12
//! evaluation:
//!   parallel_jobs: 4
//!   mutation_classes: [linearization, transition_removal]
//! ```

use crate::mutation::MutationClass;
use crate::result::{TsError, TsResult};
use serde::{Deserialize, Serialize};

/// How the reader treats transition targets that are never declared as states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndeclaredTargets {
    /// Fail with `DanglingTransition`
    #[default]
    Reject,
    /// Declare them as terminal states
    Materialize,
}

/// Reader options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Undeclared target policy
    pub undeclared_targets: UndeclaredTargets,
}

impl ParseOptions {
    /// Strict options (the default)
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }

    /// Options that materialize undeclared targets
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            undeclared_targets: UndeclaredTargets::Materialize,
        }
    }
}

/// Linearization bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearizeConfig {
    /// Copies of one state allowed on a single path before a cycle closes
    pub max_unroll: usize,
    /// Upper bound on the number of states of the result
    pub max_states: usize,
    /// Prefix of renumbered state identifiers
    pub state_prefix: String,
}

impl Default for LinearizeConfig {
    fn default() -> Self {
        Self {
            max_unroll: 1,
            max_states: 100_000,
            state_prefix: "State_".to_string(),
        }
    }
}

impl LinearizeConfig {
    /// Set the unroll bound
    #[must_use]
    pub const fn with_max_unroll(mut self, max_unroll: usize) -> Self {
        self.max_unroll = max_unroll;
        self
    }

    /// Set the state limit
    #[must_use]
    pub const fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }

    /// Set the identifier prefix
    #[must_use]
    pub fn with_state_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.state_prefix = prefix.into();
        self
    }
}

/// Test generation bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum number of actions in one test sequence
    pub max_path_length: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_path_length: 32,
        }
    }
}

impl GenerationConfig {
    /// Set the path length bound
    #[must_use]
    pub const fn with_max_path_length(mut self, max_path_length: usize) -> Self {
        self.max_path_length = max_path_length;
        self
    }
}

/// Mutant evaluation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Number of worker threads (0 = auto-detect)
    pub parallel_jobs: usize,
    /// Mutation classes to generate
    pub mutation_classes: Vec<MutationClass>,
    /// Trace length used for equivalence checks
    pub trace_depth: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            parallel_jobs: 0, // Auto-detect
            mutation_classes: MutationClass::all(),
            trace_depth: 8,
        }
    }
}

impl EvaluationConfig {
    /// Set parallel jobs
    #[must_use]
    pub const fn with_parallel_jobs(mut self, jobs: usize) -> Self {
        self.parallel_jobs = jobs;
        self
    }

    /// Restrict the generated mutation classes
    #[must_use]
    pub fn with_mutation_classes(mut self, classes: Vec<MutationClass>) -> Self {
        self.mutation_classes = classes;
        self
    }

    /// Set the trace depth
    #[must_use]
    pub const fn with_trace_depth(mut self, depth: usize) -> Self {
        self.trace_depth = depth;
        self
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reader options
    pub parse: ParseOptions,
    /// Linearization bounds
    pub linearize: LinearizeConfig,
    /// Test generation bounds
    pub generation: GenerationConfig,
    /// Evaluation settings
    pub evaluation: EvaluationConfig,
}

impl EngineConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a configuration from YAML.
    ///
    /// # Errors
    /// Returns error if YAML is invalid or a value is out of range.
    pub fn from_yaml(yaml: &str) -> TsResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Set reader options
    #[must_use]
    pub const fn with_parse(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    /// Set linearization bounds
    #[must_use]
    pub fn with_linearize(mut self, linearize: LinearizeConfig) -> Self {
        self.linearize = linearize;
        self
    }

    /// Set generation bounds
    #[must_use]
    pub const fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Set evaluation settings
    #[must_use]
    pub fn with_evaluation(mut self, evaluation: EvaluationConfig) -> Self {
        self.evaluation = evaluation;
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> TsResult<()> {
        if self.linearize.max_unroll == 0 {
            return Err(TsError::invalid_config("linearize.max_unroll must be at least 1"));
        }
        if self.linearize.max_states == 0 {
            return Err(TsError::invalid_config("linearize.max_states must be at least 1"));
        }
        if self.linearize.state_prefix.is_empty() {
            return Err(TsError::invalid_config("linearize.state_prefix must not be empty"));
        }
        if self.generation.max_path_length == 0 {
            return Err(TsError::invalid_config(
                "generation.max_path_length must be at least 1",
            ));
        }
        if self.evaluation.trace_depth == 0 {
            return Err(TsError::invalid_config("evaluation.trace_depth must be at least 1"));
        }
        Ok(())
    }
}
