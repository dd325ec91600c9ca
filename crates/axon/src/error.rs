//! Error types for network construction, evaluation and topology edits

use thiserror::Error;

/// Failures reported by [`crate::Network`] operations.
///
/// Every variant is raised before the network is touched, so a failed call
/// leaves the network exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// `evaluate` was given a different number of inputs than the input layer holds
    #[error("expected {expected} inputs, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Two networks do not share layer count and per-layer sizes
    #[error("incompatible topology: {ours:?} vs {theirs:?}")]
    IncompatibleTopology { ours: Vec<usize>, theirs: Vec<usize> },

    /// A layer index outside the range an operation accepts
    #[error("{operation}: layer index {index} out of range (layer count {layer_count})")]
    InvalidIndex {
        operation: &'static str,
        index: usize,
        layer_count: usize,
    },

    /// A network needs at least an input and an output layer
    #[error("a network needs at least 2 layers, got {count}")]
    TooFewLayers { count: usize },

    /// A layer would be created or left with zero nodes
    #[error("layer {index} must hold at least one node")]
    EmptyLayer { index: usize },

    /// The id counter cannot hand out `requested` more ids
    #[error("node ids exhausted: cannot allocate {requested} ids after {next_node_id}")]
    IdsExhausted { requested: usize, next_node_id: u32 },
}

pub type Result<T> = std::result::Result<T, NetworkError>;
