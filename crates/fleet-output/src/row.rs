//! Plain data row types written by output backends.

use fleet_core::UnixMillis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationOutcome {
    Assigned,
    NoVehicle,
}

impl AllocationOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AllocationOutcome::Assigned => "assigned",
            AllocationOutcome::NoVehicle => "no_vehicle",
        }
    }
}

/// The result of evaluating one round.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRow {
    pub task_id:        String,
    pub destination:    String,
    pub outcome:        AllocationOutcome,
    /// Winner; `None` when no vehicle was available.
    pub vehicle_id:     Option<u32>,
    /// Winner's estimate in seconds; 0 without a winner.
    pub estimated_time: f64,
    pub distance:       f64,
    pub respondents:    u64,
    pub unix_time_ms:   UnixMillis,
}

/// One completed task.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRow {
    pub task_id:        String,
    pub vehicle_id:     u32,
    pub final_node:     String,
    pub success:        bool,
    pub estimated_time: f64,
    /// Seconds from assignment to the completion report.
    pub actual_time:    f64,
    pub unix_time_ms:   UnixMillis,
}
