//! Routing-subsystem error types.

use thiserror::Error;

use fleet_core::VehicleId;

/// Failures of a routing query.  Always returned as values; a failed query
/// never affects later ones.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    #[error("no path from {from} to {to}")]
    NoPath { from: String, to: String },

    #[error("node {0:?} not found in network")]
    UnknownNode(String),

    #[error("vehicle {0} not in roster")]
    UnknownVehicle(VehicleId),

    #[error("invalid roster: {0}")]
    InvalidRoster(String),
}

pub type RoutingResult<T> = Result<T, RoutingError>;

/// Failures while reading map or roster files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {msg}")]
    Syntax { line: usize, msg: String },

    #[error(transparent)]
    Routing(#[from] RoutingError),
}
