//! Mutation operators over transition systems.
//!
//! Implements the M1-M4 structural mutation classes for statecharts plus
//! linearization (M5).
//! Reference: Fabbri et al., "Mutation Testing Applied to Validate
//! Specifications Based on Statecharts" (ISSRE 1999)

use crate::config::LinearizeConfig;
use crate::linearize::{ActionRenaming, Linearizer};
use crate::model::{Edge, TransitionSystem};
use crate::result::{TsResult, Warning};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Mutation classes for transition systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationClass {
    /// M1: State removal - remove a state and its incident transitions
    StateRemoval,
    /// M2: Transition removal - remove a transition
    TransitionRemoval,
    /// M3: Action swap - swap labels between two transitions
    ActionSwap,
    /// M4: Target swap - change transition target to different state
    TargetSwap,
    /// M5: Linearization - split every state by incoming history
    Linearization,
}

impl MutationClass {
    /// Get all mutation classes.
    pub fn all() -> Vec<MutationClass> {
        vec![
            MutationClass::StateRemoval,
            MutationClass::TransitionRemoval,
            MutationClass::ActionSwap,
            MutationClass::TargetSwap,
            MutationClass::Linearization,
        ]
    }

    /// Get the mutation class identifier (M1-M5).
    pub fn id(&self) -> &'static str {
        match self {
            MutationClass::StateRemoval => "M1",
            MutationClass::TransitionRemoval => "M2",
            MutationClass::ActionSwap => "M3",
            MutationClass::TargetSwap => "M4",
            MutationClass::Linearization => "M5",
        }
    }

    /// Get a description of the mutation class.
    pub fn description(&self) -> &'static str {
        match self {
            MutationClass::StateRemoval => "Remove a state and every transition touching it",
            MutationClass::TransitionRemoval => "Remove a transition from the model",
            MutationClass::ActionSwap => "Swap action labels between two transitions",
            MutationClass::TargetSwap => "Change a transition's target to a different state",
            MutationClass::Linearization => "Give every state a single incoming history",
        }
    }
}

/// A mutant is a modified copy of the original model.
#[derive(Debug, Clone)]
pub struct Mutant {
    /// Unique identifier for this mutant
    pub id: String,
    /// Mutation class applied
    pub class: MutationClass,
    /// Description of the mutation
    pub description: String,
    /// The mutated model
    pub system: TransitionSystem,
    /// Context suffixes introduced by linearization
    pub renaming: Option<ActionRenaming>,
    /// Conditions reported while building the mutant
    pub warnings: Vec<Warning>,
}

/// Result of running a suite against a mutant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutantResult {
    /// Mutant identifier
    pub mutant_id: String,
    /// Mutation class
    pub class: MutationClass,
    /// Whether the mutant was killed (a sequence detected the mutation)
    pub killed: bool,
    /// How the mutant was killed (if killed)
    pub kill_reason: Option<String>,
    /// Indices of the sequences that kill the mutant
    pub killing_sequences: Vec<usize>,
    /// Whether the mutant accepts the same traces as the original, up to
    /// the configured depth and modulo its renaming
    pub equivalent: bool,
}

/// Mutation score summary.
#[derive(Debug, Clone, Serialize)]
pub struct MutationScore {
    /// Total mutants generated
    pub total_mutants: usize,
    /// Mutants killed by tests
    pub killed: usize,
    /// Mutants that survived
    pub survived: usize,
    /// Surviving mutants that are trace-equivalent to the original
    pub equivalent: usize,
    /// Mutation score (killed / total)
    pub score: f64,
    /// Results by mutation class
    pub by_class: BTreeMap<MutationClass, ClassScore>,
}

/// Score for a single mutation class.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassScore {
    /// Mutants in this class
    pub total: usize,
    /// Killed mutants in this class
    pub killed: usize,
    /// Killed ratio
    pub score: f64,
}

/// Mutation generator for transition systems.
#[derive(Debug)]
pub struct MutationGenerator<'a> {
    system: &'a TransitionSystem,
    linearize: LinearizeConfig,
}

impl<'a> MutationGenerator<'a> {
    /// Create a new mutation generator for the given model.
    pub fn new(system: &'a TransitionSystem) -> Self {
        Self {
            system,
            linearize: LinearizeConfig::default(),
        }
    }

    /// Bounds used for the M5 operator.
    #[must_use]
    pub fn with_linearize_config(mut self, config: LinearizeConfig) -> Self {
        self.linearize = config;
        self
    }

    /// Generate all possible mutants across all mutation classes.
    pub fn generate_all(&self) -> Vec<Mutant> {
        self.generate_classes(&MutationClass::all())
    }

    /// Generate mutants for each of the given classes, in order.
    pub fn generate_classes(&self, classes: &[MutationClass]) -> Vec<Mutant> {
        classes.iter().flat_map(|class| self.generate(*class)).collect()
    }

    /// Generate mutants for a specific class.
    pub fn generate(&self, class: MutationClass) -> Vec<Mutant> {
        let mutants = match class {
            MutationClass::StateRemoval => self.generate_state_removals(),
            MutationClass::TransitionRemoval => self.generate_transition_removals(),
            MutationClass::ActionSwap => self.generate_action_swaps(),
            MutationClass::TargetSwap => self.generate_target_swaps(),
            MutationClass::Linearization => self.generate_linearization(),
        };
        debug!(class = class.id(), count = mutants.len(), "generated mutants");
        mutants
    }

    /// M1: Generate state removal mutants.
    fn generate_state_removals(&self) -> Vec<Mutant> {
        let mut mutants = Vec::new();
        let edges: Vec<Edge> = self.system.edges().collect();

        for state_id in self.system.state_ids() {
            // Removing the start state leaves no model
            if state_id == self.system.start() {
                continue;
            }

            let states: Vec<&str> = self
                .system
                .state_ids()
                .filter(|id| *id != state_id)
                .collect();
            let kept: Vec<Edge> = edges
                .iter()
                .filter(|e| e.source != state_id && e.target != state_id)
                .cloned()
                .collect();

            if let Ok(system) = assemble(self.system.start(), &states, &kept) {
                mutants.push(Mutant {
                    id: format!("M1_{}", state_id),
                    class: MutationClass::StateRemoval,
                    description: format!("Remove state '{}'", state_id),
                    system,
                    renaming: None,
                    warnings: Vec::new(),
                });
            }
        }

        mutants
    }

    /// M2: Generate transition removal mutants.
    fn generate_transition_removals(&self) -> Vec<Mutant> {
        let mut mutants = Vec::new();
        let states: Vec<&str> = self.system.state_ids().collect();
        let edges: Vec<Edge> = self.system.edges().collect();

        for (idx, edge) in edges.iter().enumerate() {
            let mut kept = edges.clone();
            kept.remove(idx);

            if let Ok(system) = assemble(self.system.start(), &states, &kept) {
                mutants.push(Mutant {
                    id: format!("M2_{}_{}", edge.source, edge.action),
                    class: MutationClass::TransitionRemoval,
                    description: format!("Remove transition {}", edge),
                    system,
                    renaming: None,
                    warnings: Vec::new(),
                });
            }
        }

        mutants
    }

    /// M3: Generate action swap mutants.
    fn generate_action_swaps(&self) -> Vec<Mutant> {
        let mut mutants = Vec::new();
        let states: Vec<&str> = self.system.state_ids().collect();
        let edges: Vec<Edge> = self.system.edges().collect();

        for i in 0..edges.len() {
            for j in (i + 1)..edges.len() {
                // Only swap if actions are different
                if edges[i].action == edges[j].action {
                    continue;
                }

                let mut mutated = edges.clone();
                mutated[i].action = edges[j].action.clone();
                mutated[j].action = edges[i].action.clone();

                // A swap that duplicates a label within one state is skipped
                let Ok(system) = assemble(self.system.start(), &states, &mutated) else {
                    continue;
                };
                mutants.push(Mutant {
                    id: format!(
                        "M3_{}_{}_{}_{}",
                        edges[i].source, edges[i].action, edges[j].source, edges[j].action
                    ),
                    class: MutationClass::ActionSwap,
                    description: format!("Swap actions between {} and {}", edges[i], edges[j]),
                    system,
                    renaming: None,
                    warnings: Vec::new(),
                });
            }
        }

        mutants
    }

    /// M4: Generate target swap mutants.
    fn generate_target_swaps(&self) -> Vec<Mutant> {
        let mut mutants = Vec::new();
        let states: Vec<&str> = self.system.state_ids().collect();
        let edges: Vec<Edge> = self.system.edges().collect();

        for (idx, edge) in edges.iter().enumerate() {
            for state_id in &states {
                // Skip if same as original target
                if *state_id == edge.target {
                    continue;
                }

                let mut mutated = edges.clone();
                mutated[idx].target = (*state_id).to_string();

                if let Ok(system) = assemble(self.system.start(), &states, &mutated) {
                    mutants.push(Mutant {
                        id: format!("M4_{}_{}_{}", edge.source, edge.action, state_id),
                        class: MutationClass::TargetSwap,
                        description: format!(
                            "Change target of {} to '{}'",
                            edge, state_id
                        ),
                        system,
                        renaming: None,
                        warnings: Vec::new(),
                    });
                }
            }
        }

        mutants
    }

    /// M5: Generate the linearization mutant.
    fn generate_linearization(&self) -> Vec<Mutant> {
        match Linearizer::new(self.linearize.clone()).linearize(self.system) {
            Ok(linearization) => vec![Mutant {
                id: "M5_linearization".to_string(),
                class: MutationClass::Linearization,
                description: format!(
                    "Linearize into {} states, {} renamed actions",
                    linearization.system.state_count(),
                    linearization.renaming.len()
                ),
                system: linearization.system,
                renaming: Some(linearization.renaming),
                warnings: linearization.warnings,
            }],
            Err(e) => {
                warn!(error = %e, "skipping linearization mutant");
                Vec::new()
            }
        }
    }
}

/// Build a model from explicit states and edges.
fn assemble(start: &str, states: &[&str], edges: &[Edge]) -> TsResult<TransitionSystem> {
    let mut builder = TransitionSystem::builder(start);
    for state_id in states {
        builder = builder.state(*state_id);
    }
    for edge in edges {
        builder = builder.transition(&edge.source, &edge.action, &edge.target);
    }
    builder.build()
}

/// Calculate mutation score from results.
pub fn calculate_mutation_score(results: &[MutantResult]) -> MutationScore {
    let total_mutants = results.len();
    let killed = results.iter().filter(|r| r.killed).count();
    let survived = total_mutants - killed;
    let equivalent = results.iter().filter(|r| !r.killed && r.equivalent).count();
    let score = if total_mutants > 0 {
        killed as f64 / total_mutants as f64
    } else {
        1.0
    };

    // Calculate per-class scores
    let mut by_class: BTreeMap<MutationClass, ClassScore> = BTreeMap::new();

    for class in MutationClass::all() {
        let class_results: Vec<_> = results.iter().filter(|r| r.class == class).collect();
        let class_total = class_results.len();
        let class_killed = class_results.iter().filter(|r| r.killed).count();

        by_class.insert(
            class,
            ClassScore {
                total: class_total,
                killed: class_killed,
                score: if class_total > 0 {
                    class_killed as f64 / class_total as f64
                } else {
                    1.0
                },
            },
        );
    }

    MutationScore {
        total_mutants,
        killed,
        survived,
        equivalent,
        score,
        by_class,
    }
}
