use doc_model::NodeKey;
use thiserror::Error;

/// Which snapshot of a pass an identifier was looked up in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Previous,
    Next,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Previous => f.write_str("previous"),
            Side::Next => f.write_str("next"),
        }
    }
}

/// Internal-consistency failures of a reconciliation pass or a position query.
///
/// None of these are retried automatically. A failed pass leaves the
/// committed range cache and the frontend untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("no range cache entry for {0}")]
    MissingRangeEntry(NodeKey),
    #[error("node {key} is missing from the {side} snapshot")]
    MissingNode { key: NodeKey, side: Side },
    #[error("traversal budget of {budget} node visits exhausted")]
    TraversalBudgetExceeded { budget: usize },
    #[error("tree depth exceeds the limit of {limit}")]
    DepthLimitExceeded { limit: usize },
    #[error("offset {offset} is not a valid position inside {key}")]
    InvalidPoint { key: NodeKey, offset: usize },
    #[error("range cache for {key} records {actual} chars where the snapshot has {expected}")]
    LengthMismatch {
        key: NodeKey,
        expected: usize,
        actual: usize,
    },
    #[error("{0} is not a text node")]
    NotTextNode(NodeKey),
    #[error("shifting ranges after {key} by {delta} underflows")]
    InvalidDelta { key: NodeKey, delta: isize },
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
