//! Allocation metrics collected from coordinator callbacks.
//!
//! [`AllocationMetrics`] is a [`CoordinatorObserver`]; attach it with
//! [`CoordinatorBuilder::observer`][crate::CoordinatorBuilder::observer] and
//! read [`AllocationMetrics::summary`] after the run.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use fleet_core::{TaskId, VehicleId, now_millis, time::secs_between};
use fleet_protocol::{Acceptance, Completion, Estimate, NodeUpdate, Proposal};

use crate::observer::CoordinatorObserver;
use crate::task::{ActiveAssignment, Task};

// ── Records ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCounts {
    pub cfps_sent:            u64,
    pub proposals_received:   u64,
    pub assignments_sent:     u64,
    pub rejections_sent:      u64,
    pub acceptances_received: u64,
    pub completions_received: u64,
    pub updates_received:     u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDecision {
    pub task_id:        TaskId,
    pub destination:    String,
    pub winner:         VehicleId,
    pub estimated_time: f64,
    pub distance:       f64,
    pub respondents:    usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleTally {
    pub proposals:          u64,
    pub busy_replies:       u64,
    pub wins:               u64,
    pub declined:           u64,
    pub completions:        u64,
    pub mean_response_secs: f64,
    #[serde(skip)]
    response_total:         f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationTally {
    pub requested:            u64,
    pub completed:            u64,
    pub mean_completion_secs: f64,
    #[serde(skip)]
    completion_total:         f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub task_id:        TaskId,
    pub vehicle_id:     VehicleId,
    pub final_node:     String,
    pub success:        bool,
    pub estimated_time: f64,
    pub actual_time:    f64,
}

// ── AllocationMetrics ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct AllocationMetrics {
    pub messages:       MessageCounts,
    /// Seconds from CFP to each proposal.
    pub response_times: Vec<f64>,
    pub allocations:    Vec<AllocationDecision>,
    pub completions:    Vec<CompletionRecord>,
    pub rejected_tasks: Vec<TaskId>,
    pub vehicles:       BTreeMap<VehicleId, VehicleTally>,
    pub destinations:   BTreeMap<String, DestinationTally>,
    pub tasks_issued:   u64,
}

impl AllocationMetrics {
    /// Start with a zero tally for every vehicle so idle vehicles count
    /// towards the fairness index.
    pub fn new(vehicles: impl IntoIterator<Item = VehicleId>) -> Self {
        Self {
            vehicles: vehicles.into_iter().map(|v| (v, VehicleTally::default())).collect(),
            ..Self::default()
        }
    }

    /// Gini index of per-vehicle completion counts: 0 is a perfectly even
    /// spread, values towards 1 mean a few vehicles did all the work.
    /// Zero while nothing has completed.
    pub fn gini(&self) -> f64 {
        let counts: Vec<u64> = self.vehicles.values().map(|t| t.completions).collect();
        gini(&counts)
    }

    pub fn mean_response_secs(&self) -> f64 {
        mean(&self.response_times)
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            tasks_issued:       self.tasks_issued,
            tasks_allocated:    self.allocations.len(),
            tasks_completed:    self.completions.len(),
            tasks_rejected:     self.rejected_tasks.len(),
            mean_response_secs: self.mean_response_secs(),
            gini:               self.gini(),
            messages:           self.messages.clone(),
            vehicles:           self.vehicles.iter().map(|(id, t)| (id.0, t.clone())).collect(),
            destinations:       self.destinations.clone(),
        }
    }
}

/// `2·Σ((i+1)·xᵢ) / (n·Σx) − (n+1)/n` over ascending counts.
pub fn gini(counts: &[u64]) -> f64 {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    let n = sorted.len() as f64;
    let weighted: f64 = sorted.iter().enumerate().map(|(i, &x)| (i + 1) as f64 * x as f64).sum();
    2.0 * weighted / (n * total as f64) - (n + 1.0) / n
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() { 0.0 } else { values.iter().sum::<f64>() / values.len() as f64 }
}

impl CoordinatorObserver for AllocationMetrics {
    fn on_round_start(&mut self, task: &Task, recipients: usize) {
        self.tasks_issued += 1;
        self.messages.cfps_sent += recipients as u64;
        self.destinations.entry(task.destination.clone()).or_default().requested += 1;
    }

    fn on_proposal(&mut self, _task: &Task, proposal: &Proposal, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        self.messages.proposals_received += 1;
        self.response_times.push(secs);

        let tally = self.vehicles.entry(proposal.vehicle_id).or_default();
        tally.proposals += 1;
        if proposal.is_busy {
            tally.busy_replies += 1;
        }
        tally.response_total += secs;
        tally.mean_response_secs = tally.response_total / tally.proposals as f64;
    }

    fn on_allocation(&mut self, task: &Task, winner: VehicleId, estimate: &Estimate, losers: &[VehicleId]) {
        self.messages.assignments_sent += 1;
        self.messages.rejections_sent += losers.len() as u64;
        self.vehicles.entry(winner).or_default().wins += 1;
        self.allocations.push(AllocationDecision {
            task_id:        task.id.clone(),
            destination:    task.destination.clone(),
            winner,
            estimated_time: estimate.estimated_time,
            distance:       estimate.distance,
            respondents:    losers.len() + 1,
        });
    }

    fn on_no_vehicle(&mut self, task: &Task, _respondents: usize) {
        self.rejected_tasks.push(task.id.clone());
    }

    fn on_acceptance(&mut self, acceptance: &Acceptance) {
        self.messages.acceptances_received += 1;
        if !acceptance.accepted {
            self.vehicles.entry(acceptance.vehicle_id).or_default().declined += 1;
        }
    }

    fn on_completion(&mut self, assignment: &ActiveAssignment, completion: &Completion) {
        let actual = secs_between(assignment.started_at, now_millis()).max(0.0);
        self.messages.completions_received += 1;
        self.vehicles.entry(completion.vehicle_id).or_default().completions += 1;

        let dest = self.destinations.entry(assignment.task.destination.clone()).or_default();
        dest.completed += 1;
        dest.completion_total += actual;
        dest.mean_completion_secs = dest.completion_total / dest.completed as f64;

        self.completions.push(CompletionRecord {
            task_id:        completion.task_id.clone(),
            vehicle_id:     completion.vehicle_id,
            final_node:     completion.final_node.clone(),
            success:        completion.success,
            estimated_time: assignment.estimated_time,
            actual_time:    actual,
        });
        tracing::info!(gini = self.gini(), "task distribution fairness");
    }

    fn on_node_update(&mut self, _update: &NodeUpdate) {
        self.messages.updates_received += 1;
    }
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Serialisable end-of-run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub tasks_issued:       u64,
    pub tasks_allocated:    usize,
    pub tasks_completed:    usize,
    pub tasks_rejected:     usize,
    pub mean_response_secs: f64,
    pub gini:               f64,
    pub messages:           MessageCounts,
    /// Keyed by numeric vehicle id.
    pub vehicles:           BTreeMap<u32, VehicleTally>,
    pub destinations:       BTreeMap<String, DestinationTally>,
}
