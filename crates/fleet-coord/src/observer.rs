//! Coordinator observer trait for metrics and output.

use std::time::Duration;

use fleet_core::VehicleId;
use fleet_protocol::{Acceptance, Completion, Estimate, NodeUpdate, Proposal};

use crate::task::{ActiveAssignment, Task};

/// Callbacks invoked by [`CoordinatorCore`][crate::CoordinatorCore] as rounds
/// progress.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.  Two observers can be combined as a tuple.
///
/// # Example: completion counter
///
/// ```rust,ignore
/// struct Completions(usize);
///
/// impl CoordinatorObserver for Completions {
///     fn on_completion(&mut self, _a: &ActiveAssignment, _c: &Completion) {
///         self.0 += 1;
///     }
/// }
/// ```
pub trait CoordinatorObserver {
    /// A CFP for `task` went out to `recipients` vehicles.
    fn on_round_start(&mut self, _task: &Task, _recipients: usize) {}

    /// A proposal for the current round arrived `elapsed` after its CFP.
    fn on_proposal(&mut self, _task: &Task, _proposal: &Proposal, _elapsed: Duration) {}

    /// `winner` was assigned `task`; `losers` were sent rejections.
    fn on_allocation(
        &mut self,
        _task:     &Task,
        _winner:   VehicleId,
        _estimate: &Estimate,
        _losers:   &[VehicleId],
    ) {}

    /// Evaluation found no available vehicle among `respondents`.
    fn on_no_vehicle(&mut self, _task: &Task, _respondents: usize) {}

    fn on_acceptance(&mut self, _acceptance: &Acceptance) {}

    /// First completion report for an active assignment.  Duplicates are
    /// not forwarded.
    fn on_completion(&mut self, _assignment: &ActiveAssignment, _completion: &Completion) {}

    fn on_node_update(&mut self, _update: &NodeUpdate) {}

    /// The task limit was reached and every assignment has completed.
    fn on_drained(&mut self, _issued: u64, _completed: usize) {}
}

/// A [`CoordinatorObserver`] that does nothing.
pub struct NoopObserver;

impl CoordinatorObserver for NoopObserver {}

impl<A: CoordinatorObserver, B: CoordinatorObserver> CoordinatorObserver for (A, B) {
    fn on_round_start(&mut self, task: &Task, recipients: usize) {
        self.0.on_round_start(task, recipients);
        self.1.on_round_start(task, recipients);
    }

    fn on_proposal(&mut self, task: &Task, proposal: &Proposal, elapsed: Duration) {
        self.0.on_proposal(task, proposal, elapsed);
        self.1.on_proposal(task, proposal, elapsed);
    }

    fn on_allocation(&mut self, task: &Task, winner: VehicleId, estimate: &Estimate, losers: &[VehicleId]) {
        self.0.on_allocation(task, winner, estimate, losers);
        self.1.on_allocation(task, winner, estimate, losers);
    }

    fn on_no_vehicle(&mut self, task: &Task, respondents: usize) {
        self.0.on_no_vehicle(task, respondents);
        self.1.on_no_vehicle(task, respondents);
    }

    fn on_acceptance(&mut self, acceptance: &Acceptance) {
        self.0.on_acceptance(acceptance);
        self.1.on_acceptance(acceptance);
    }

    fn on_completion(&mut self, assignment: &ActiveAssignment, completion: &Completion) {
        self.0.on_completion(assignment, completion);
        self.1.on_completion(assignment, completion);
    }

    fn on_node_update(&mut self, update: &NodeUpdate) {
        self.0.on_node_update(update);
        self.1.on_node_update(update);
    }

    fn on_drained(&mut self, issued: u64, completed: usize) {
        self.0.on_drained(issued, completed);
        self.1.on_drained(issued, completed);
    }
}
