//! Result, error and warning types for tsmut.

use crate::model::Edge;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for tsmut operations
pub type TsResult<T> = Result<T, TsError>;

/// Errors that can occur in tsmut
#[derive(Debug, Error)]
pub enum TsError {
    /// Document is not well formed or misses required elements/attributes
    #[error("Malformed document: {message}")]
    MalformedDocument {
        /// Error message
        message: String,
    },

    /// Transition references a state that is not declared
    #[error("Transition '{action}' of state '{state_id}' targets unknown state '{target}'")]
    DanglingTransition {
        /// Source state
        state_id: String,
        /// Action label of the transition
        action: String,
        /// Missing target state
        target: String,
    },

    /// Declared start state does not exist
    #[error("Start state '{start}' does not exist")]
    UnknownStart {
        /// Declared start identifier
        start: String,
    },

    /// A state declares the same action label twice
    #[error("State '{state_id}' declares action '{action}' more than once")]
    DuplicateAction {
        /// State carrying the duplicate
        state_id: String,
        /// Duplicated action label
        action: String,
    },

    /// A test sequence without any action was submitted for replay
    #[error("Test sequence is empty")]
    EmptySequence,

    /// A transformation would produce more states than allowed
    #[error("State limit of {limit} exceeded")]
    StateLimitExceeded {
        /// Configured limit
        limit: usize,
    },

    /// Configuration value out of range
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl TsError {
    /// Create a malformed document error
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Non-fatal condition reported alongside a result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// State cannot be reached from the start state
    UnreachableState {
        /// Pruned or unvisited state
        state_id: String,
    },
    /// Reachable transition left uncovered by the path length bound
    UncoveredTransition {
        /// Transition that no sequence traverses
        edge: Edge,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreachableState { state_id } => {
                write!(f, "state '{}' is unreachable from the start state", state_id)
            }
            Self::UncoveredTransition { edge } => {
                write!(f, "transition {} is beyond the path length bound", edge)
            }
        }
    }
}
