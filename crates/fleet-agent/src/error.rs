//! Agent error types.

use thiserror::Error;

use fleet_routing::RoutingError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Routing(#[from] RoutingError),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Telemetry that contradicts the planned path.  The update is discarded.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConsistencyError {
    #[error("reported location {node:?} is not the next stop on the planned path")]
    OffPathLocation { node: String },

    #[error("reported {node:?} at {progress}% is behind path index {path_index}")]
    BackwardProgress { node: String, progress: f64, path_index: usize },
}
