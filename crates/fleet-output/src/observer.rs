//! `OutputObserver<W>`: bridges `CoordinatorObserver` to an `OutputWriter`.

use fleet_coord::{ActiveAssignment, CoordinatorObserver, Task};
use fleet_core::{VehicleId, now_millis, time::secs_between};
use fleet_protocol::{Completion, Estimate};

use crate::row::{AllocationOutcome, AllocationRow, CompletionRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`CoordinatorObserver`] that writes one row per evaluated round and one
/// per completed task to any [`OutputWriter`] backend.
///
/// Errors from the writer are stored internally because observer methods
/// have no return value.  After the coordinator stops, call
/// [`finish`][Self::finish] and check [`take_error`][Self::take_error].
pub struct OutputObserver<W: OutputWriter> {
    writer:     W,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> OutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, last_error: None }
    }

    /// Flush the writer.  Also called when the coordinator drains.
    pub fn finish(&mut self) {
        let result = self.writer.finish();
        self.store_err(result);
    }

    /// Take the stored write error (if any).
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files after the run).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> CoordinatorObserver for OutputObserver<W> {
    fn on_allocation(&mut self, task: &Task, winner: VehicleId, estimate: &Estimate, losers: &[VehicleId]) {
        let row = AllocationRow {
            task_id:        task.id.to_string(),
            destination:    task.destination.clone(),
            outcome:        AllocationOutcome::Assigned,
            vehicle_id:     Some(winner.0),
            estimated_time: estimate.estimated_time,
            distance:       estimate.distance,
            respondents:    losers.len() as u64 + 1,
            unix_time_ms:   now_millis(),
        };
        let result = self.writer.write_allocation(&row);
        self.store_err(result);
    }

    fn on_no_vehicle(&mut self, task: &Task, respondents: usize) {
        let row = AllocationRow {
            task_id:        task.id.to_string(),
            destination:    task.destination.clone(),
            outcome:        AllocationOutcome::NoVehicle,
            vehicle_id:     None,
            estimated_time: 0.0,
            distance:       0.0,
            respondents:    respondents as u64,
            unix_time_ms:   now_millis(),
        };
        let result = self.writer.write_allocation(&row);
        self.store_err(result);
    }

    fn on_completion(&mut self, assignment: &ActiveAssignment, completion: &Completion) {
        let now = now_millis();
        let row = CompletionRow {
            task_id:        completion.task_id.to_string(),
            vehicle_id:     completion.vehicle_id.0,
            final_node:     completion.final_node.clone(),
            success:        completion.success,
            estimated_time: assignment.estimated_time,
            actual_time:    secs_between(assignment.started_at, now).max(0.0),
            unix_time_ms:   now,
        };
        let result = self.writer.write_completion(&row);
        self.store_err(result);
    }

    fn on_drained(&mut self, _issued: u64, _completed: usize) {
        self.finish();
    }
}
