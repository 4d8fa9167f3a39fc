//! Error types.

use thiserror::Error;

use crate::config::Heuristic;

/// Failures of the external solver exchange. All of them are recoverable:
/// the orchestrator falls back to savings-merge.
#[derive(Debug, Error)]
pub enum RemoteSolverError {
    #[error("no remote solver configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("solver responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("solver response has no result")]
    MissingResult,

    #[error("malformed solver response: {0}")]
    Malformed(String),

    #[error("deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Failures of a heuristic run.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("{heuristic} was cancelled")]
    Cancelled { heuristic: Heuristic },
}
