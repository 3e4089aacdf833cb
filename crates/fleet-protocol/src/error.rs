//! Protocol and transport error types.

use std::time::Duration;

use thiserror::Error;

use fleet_core::{TaskId, VehicleId};

use crate::Address;

/// Semantic failures of a well-formed message.  Receivers log and discard
/// these; no negative acknowledgment is ever sent.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("stale message for task {got} (current round: {current:?})")]
    StaleTask { got: TaskId, current: Option<TaskId> },

    #[error("no mailbox registered for {0}")]
    UnknownRecipient(Address),

    #[error("vehicle {vehicle} was not asked to bid on task {task}")]
    UnexpectedSender { vehicle: VehicleId, task: TaskId },

    #[error("invalid message: {0}")]
    Invalid(String),
}

/// Failures on the bus or control session.  Always resolved locally.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("peer disconnected")]
    Disconnected,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::MalformedPayload(e.to_string())
    }
}
