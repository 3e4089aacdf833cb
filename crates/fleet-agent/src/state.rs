//! Per-vehicle state owned by its agent.
//!
//! `path_index` is the index in `planned_path` of the last node the vehicle
//! reached; the node it is heading for is `planned_path[path_index + 1]`.
//! A fresh plan starts at index 0, where `planned_path[0]` is the node the
//! vehicle stood on when the plan was made.

use fleet_core::{TaskId, VehicleId};
use fleet_protocol::Telemetry;
use fleet_routing::NetworkGraph;

use crate::ConsistencyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Idle,
    /// Assignment taken; path not yet planned.
    Assigned,
    Executing,
    /// Final node reached; Completion is being reported.
    Completed,
}

/// What a telemetry record did to the state.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryOutcome {
    /// In-transit update; progress recorded.
    Progress,
    /// Arrived at an intermediate node.  `next` is the following hop.
    Advanced { node: String, next: String },
    /// Arrived at the task's final node.
    Finished { node: String },
    /// Idle vehicle reported standing on a (possibly new) node.
    Relocated { node: String },
    /// Nothing to do: no usable location, or a repeat of a known fact.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub id:                VehicleId,
    pub current_node:      String,
    pub busy:              bool,
    pub task_id:           Option<TaskId>,
    pub planned_path:      Vec<String>,
    pub path_index:        usize,
    pub final_destination: Option<String>,
    /// Percent of the current hop, `0..=100`.  Reset when a hop starts.
    pub progress:          f64,
    pub phase:             AgentPhase,
}

impl VehicleState {
    pub fn new(id: VehicleId, start_node: impl Into<String>) -> Self {
        Self {
            id,
            current_node:      start_node.into(),
            busy:              false,
            task_id:           None,
            planned_path:      Vec::new(),
            path_index:        0,
            final_destination: None,
            progress:          0.0,
            phase:             AgentPhase::Idle,
        }
    }

    /// Take an assignment.  The caller has checked `!busy`.
    pub fn assign(&mut self, task_id: TaskId, destination: impl Into<String>) {
        self.busy = true;
        self.task_id = Some(task_id);
        self.final_destination = Some(destination.into());
        self.phase = AgentPhase::Assigned;
    }

    /// Store the planned path and start executing it.
    pub fn execute(&mut self, path: Vec<String>) {
        self.planned_path = path;
        self.path_index = 0;
        self.progress = 0.0;
        self.phase = AgentPhase::Executing;
    }

    /// Back to idle, keeping only the current node.
    pub fn reset(&mut self) {
        self.busy = false;
        self.task_id = None;
        self.planned_path.clear();
        self.path_index = 0;
        self.final_destination = None;
        self.progress = 0.0;
        self.phase = AgentPhase::Idle;
    }

    /// The node the vehicle is heading for, while executing.
    pub fn next_target(&self) -> Option<&str> {
        if self.phase != AgentPhase::Executing {
            return None;
        }
        self.planned_path.get(self.path_index + 1).map(String::as_str)
    }

    /// A plan of a single node means the vehicle is already there.
    pub fn plan_is_trivial(&self) -> bool {
        self.planned_path.len() <= 1
    }

    /// Apply one canonical telemetry record.
    ///
    /// While executing, the reported location must lie on the planned path
    /// and must not move backwards: not an arrival behind the current index,
    /// not an in-transit location more than one node behind, and not a
    /// progress value lower than the last one within the same hop.  Anything
    /// else is rejected with a [`ConsistencyError`] and leaves the state as
    /// it was.
    pub fn observe(&mut self, t: &Telemetry, network: &NetworkGraph) -> Result<TelemetryOutcome, ConsistencyError> {
        let Some(node) = t.current_location.as_deref() else {
            return Ok(TelemetryOutcome::Unchanged);
        };

        if self.phase != AgentPhase::Executing {
            if t.arrived() && node != self.current_node && network.contains(node) {
                self.current_node = node.to_owned();
                return Ok(TelemetryOutcome::Relocated { node: node.to_owned() });
            }
            return Ok(TelemetryOutcome::Unchanged);
        }

        let Some(idx) = self.planned_path.iter().position(|n| n == node) else {
            return Err(ConsistencyError::OffPathLocation { node: node.to_owned() });
        };
        let path_index = self.path_index;
        let backward = || ConsistencyError::BackwardProgress {
            node: node.to_owned(),
            progress: t.progress,
            path_index,
        };

        if t.arrived() {
            return match idx {
                i if i == self.path_index + 1 => {
                    self.path_index = i;
                    self.current_node = node.to_owned();
                    self.progress = 0.0;
                    if i + 1 == self.planned_path.len() {
                        self.phase = AgentPhase::Completed;
                        Ok(TelemetryOutcome::Finished { node: node.to_owned() })
                    } else {
                        let next = self.planned_path[i + 1].clone();
                        Ok(TelemetryOutcome::Advanced { node: node.to_owned(), next })
                    }
                }
                i if i == self.path_index => Ok(TelemetryOutcome::Unchanged),
                i if i < self.path_index => Err(backward()),
                _ => Err(ConsistencyError::OffPathLocation { node: node.to_owned() }),
            };
        }

        // In transit the canonical location is the node just left, or the
        // one being approached.
        if idx < self.path_index || idx > self.path_index + 1 {
            return Err(if idx < self.path_index {
                backward()
            } else {
                ConsistencyError::OffPathLocation { node: node.to_owned() }
            });
        }
        if t.progress < self.progress {
            return Err(backward());
        }
        self.progress = t.progress;
        Ok(TelemetryOutcome::Progress)
    }
}
