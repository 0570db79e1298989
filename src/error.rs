//! Error taxonomy of the explorer.
//!
//! Every variant is caught by the component that produced it and turned into a
//! [`Status`](crate::explorer::Status) line; none of them is allowed to unwind
//! through the frame loop.

use thiserror::Error;

/// Failure reported by a [`NeighborFetcher`](crate::explorer::NeighborFetcher).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The element is not part of the index.
    #[error("element '{0}' not found")]
    UnknownElement(String),
    /// The backend could not answer; the message is surfaced verbatim.
    #[error("{0}")]
    Backend(String),
    /// The worker thread went away before replying.
    #[error("neighbor fetch worker disconnected")]
    Disconnected,
}

/// Failure of a projection layout.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("projection needs at least 2 nodes with vectors, found {found}")]
    NotEnoughVectors { found: usize },
    #[error("projection produced non-finite coordinates")]
    NonFinite,
    #[error("projection worker disconnected")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("failed to fetch neighbors of '{element}': {source}")]
    FetchFailure {
        element: String,
        #[source]
        source: FetchError,
    },
    #[error("node budget of {max_nodes} reached")]
    BudgetExceeded { max_nodes: usize },
    #[error("projection failed: {0}")]
    ProjectionFailure(#[from] ProjectionError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("another {0} is still running")]
    Busy(&'static str),
}

impl ExplorerError {
    /// Budget and busy conditions are informational rather than failures.
    pub fn is_notice(&self) -> bool {
        matches!(self, Self::BudgetExceeded { .. } | Self::Busy(_))
    }
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to read preferences from {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write preferences to {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("preferences file {path} is not valid JSON")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
