//! Error types for the strategy engine.

use thiserror::Error;

use crate::engine::config::ConfigError;
use crate::engine::game::NodeIndex;

/// Ways in which the tree and the strategy request can disagree.
///
/// Any of these aborts the round being computed. Persistent per-role state
/// is left exactly as it was before the round started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    #[error("label '{label}' is not of the form 'role:position:action'")]
    MalformedLabel { label: String },

    #[error("node {index} does not exist in the game tree")]
    UnknownNode { index: NodeIndex },

    #[error("node {node} has no ancestor but is not the root")]
    MissingAncestor { node: NodeIndex },

    #[error("ancestry of node {node} does not reach the root within {steps} steps")]
    CyclicAncestry { node: NodeIndex, steps: usize },

    #[error("information set {group} expects {expected} labels, only {found} left")]
    LabelsExhausted {
        group: usize,
        expected: usize,
        found: usize,
    },

    #[error("{count} labels are not covered by any information set")]
    UnconsumedLabels { count: usize },
}

/// Main error type of the engine.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EngineError {
    #[error("strategy structure does not match the game: {0}")]
    StructuralMismatch(#[from] Mismatch),

    #[error("strategy rejected {attempts} times, last reason: {reason}")]
    SubmissionRejected { attempts: u32, reason: String },

    #[error("game tree still unavailable after {polls} polls")]
    TreeUnavailable { polls: u32 },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
