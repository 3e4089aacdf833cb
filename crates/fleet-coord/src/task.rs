//! Tasks and the assignments made for them.

use fleet_core::{TaskId, UnixMillis, VehicleId, now_millis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Created; CFP not yet sent.
    Pending,
    /// CFP broadcast; waiting for proposals.
    Proposed,
    Assigned,
    /// The winner accepted and is driving.
    Executing,
    Completed,
    /// Evaluation found no available vehicle.
    RejectedNoVehicle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id:          TaskId,
    pub destination: String,
    pub state:       TaskState,
    pub created_at:  UnixMillis,
}

impl Task {
    /// A fresh pending task for `destination`.
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            id:          TaskId::fresh(),
            destination: destination.into(),
            state:       TaskState::Pending,
            created_at:  now_millis(),
        }
    }
}

/// A task handed to a vehicle and not yet completed.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveAssignment {
    pub task:           Task,
    pub vehicle:        VehicleId,
    pub estimated_time: f64,
    pub started_at:     UnixMillis,
    /// The winner's Acceptance, once it arrives.  `Some(false)` is recorded
    /// and nothing else happens: the task stays assigned.
    pub accepted:       Option<bool>,
}
