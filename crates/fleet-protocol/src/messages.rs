//! Contract-net message records.
//!
//! Every message kind is a flat record with camelCase field names.  On the
//! wire they are JSON objects carrying a `kind` discriminator; in process they
//! travel as [`Message`] values inside an [`Envelope`](crate::Envelope).
//!
//! Decoding is closed: an unknown `kind`, a missing field, or a record that
//! fails [`Message::validate`] is rejected, never coerced.

use serde::{Deserialize, Serialize};

use fleet_core::{TaskId, UnixMillis, VehicleId};

use crate::{ProtocolError, TransportError};

// ── Records ───────────────────────────────────────────────────────────────────

/// Coordinator → every vehicle: bid on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallForProposal {
    pub task_id:          TaskId,
    pub destination_node: String,
    pub timestamp:        UnixMillis,
}

/// Priced path carried by a non-busy proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub estimated_time: f64,
    pub planned_path:   Vec<String>,
    pub distance:       f64,
    pub carbon:         f64,
    pub cost:           f64,
}

/// Vehicle → coordinator: a bid, or a busy notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub task_id:      TaskId,
    pub vehicle_id:   VehicleId,
    pub is_busy:      bool,
    pub current_node: String,
    /// Present exactly when `is_busy` is false.
    #[serde(flatten)]
    pub estimate:     Option<Estimate>,
}

impl Proposal {
    pub fn busy(task_id: TaskId, vehicle_id: VehicleId, current_node: impl Into<String>) -> Self {
        Self { task_id, vehicle_id, is_busy: true, current_node: current_node.into(), estimate: None }
    }

    pub fn bid(task_id: TaskId, vehicle_id: VehicleId, current_node: impl Into<String>, estimate: Estimate) -> Self {
        Self { task_id, vehicle_id, is_busy: false, current_node: current_node.into(), estimate: Some(estimate) }
    }

    /// The estimate, if this proposal is eligible for award.
    pub fn available(&self) -> Option<&Estimate> {
        if self.is_busy { None } else { self.estimate.as_ref() }
    }
}

/// Coordinator → winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub task_id:          TaskId,
    pub destination_node: String,
    pub vehicle_id:       VehicleId,
}

/// Coordinator → every other respondent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub task_id:    TaskId,
    pub vehicle_id: VehicleId,
}

/// Winner → coordinator: whether the assignment was taken on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acceptance {
    pub task_id:    TaskId,
    pub vehicle_id: VehicleId,
    pub accepted:   bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_path: Option<Vec<String>>,
}

/// Vehicle → coordinator: the task's final node was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub task_id:    TaskId,
    pub vehicle_id: VehicleId,
    pub final_node: String,
    pub success:    bool,
}

/// Vehicle → coordinator: periodic position report while executing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    pub vehicle_id:   VehicleId,
    pub current_node: String,
    pub next_node:    Option<String>,
    pub progress:     f64,
}

// ── Message ───────────────────────────────────────────────────────────────────

/// Closed set of protocol messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Message {
    CallForProposal(CallForProposal),
    Proposal(Proposal),
    Assignment(Assignment),
    Rejection(Rejection),
    Acceptance(Acceptance),
    Completion(Completion),
    NodeUpdate(NodeUpdate),
}

impl Message {
    /// Discriminator label, as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::CallForProposal(_) => "callForProposal",
            Message::Proposal(_)        => "proposal",
            Message::Assignment(_)      => "assignment",
            Message::Rejection(_)       => "rejection",
            Message::Acceptance(_)      => "acceptance",
            Message::Completion(_)      => "completion",
            Message::NodeUpdate(_)      => "nodeUpdate",
        }
    }

    /// Task the message refers to.  `None` for `NodeUpdate`.
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Message::CallForProposal(m) => Some(&m.task_id),
            Message::Proposal(m)        => Some(&m.task_id),
            Message::Assignment(m)      => Some(&m.task_id),
            Message::Rejection(m)       => Some(&m.task_id),
            Message::Acceptance(m)      => Some(&m.task_id),
            Message::Completion(m)      => Some(&m.task_id),
            Message::NodeUpdate(_)      => None,
        }
    }

    /// Schema checks beyond what the type system enforces.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let invalid = |msg: &str| Err(ProtocolError::Invalid(format!("{}: {msg}", self.kind())));
        match self {
            Message::CallForProposal(m) if m.destination_node.is_empty() => invalid("empty destination"),
            Message::Assignment(m) if m.destination_node.is_empty() => invalid("empty destination"),
            Message::Proposal(p) => match (&p.estimate, p.is_busy) {
                (Some(_), true) => invalid("busy proposal carries an estimate"),
                (None, false)   => invalid("available proposal without an estimate"),
                (Some(e), false) => {
                    let finite = [e.estimated_time, e.distance, e.carbon, e.cost];
                    if finite.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        invalid("estimate values must be finite and non-negative")
                    } else if e.planned_path.is_empty() {
                        invalid("empty planned path")
                    } else {
                        Ok(())
                    }
                }
                (None, true) => Ok(()),
            },
            Message::NodeUpdate(u) if !(0.0..=100.0).contains(&u.progress) => {
                invalid("progress outside 0..=100")
            }
            _ => Ok(()),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse and validate a wire message.
    pub fn decode(bytes: &[u8]) -> Result<Message, TransportError> {
        let msg: Message = serde_json::from_slice(bytes)?;
        msg.validate()
            .map_err(|e| TransportError::MalformedPayload(e.to_string()))?;
        Ok(msg)
    }
}

macro_rules! impl_from_record {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Message {
                fn from(m: $variant) -> Self {
                    Message::$variant(m)
                }
            }
        )*
    };
}

impl_from_record!(CallForProposal, Proposal, Assignment, Rejection, Acceptance, Completion, NodeUpdate);
