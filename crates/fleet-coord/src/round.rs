//! One negotiation round and its evaluation.

use std::collections::{BTreeMap, BTreeSet};

use tokio::time::Instant;

use fleet_core::VehicleId;
use fleet_protocol::{Estimate, Proposal};

use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    AwaitingProposals,
    Evaluating,
}

/// Result of evaluating a round's proposals.
#[derive(Debug, Clone, PartialEq)]
pub enum Award {
    Winner {
        vehicle:  VehicleId,
        estimate: Estimate,
        /// Every other respondent, busy or outbid, in ascending id order.
        losers:   Vec<VehicleId>,
    },
    NoVehicle,
}

/// Pick the winning proposal.
///
/// Only available proposals (not busy, with an estimate) compete.  The
/// smallest `estimated_time` wins; among equal times the lowest vehicle id
/// wins, which falls out of scanning the map in key order and replacing the
/// best only on a strictly smaller time.
pub fn evaluate(proposals: &BTreeMap<VehicleId, Proposal>) -> Award {
    let mut best: Option<(VehicleId, &Estimate)> = None;
    for (&vehicle, proposal) in proposals {
        let Some(estimate) = proposal.available() else { continue };
        let better = match best {
            None => true,
            Some((_, current)) => estimate.estimated_time.total_cmp(&current.estimated_time).is_lt(),
        };
        if better {
            best = Some((vehicle, estimate));
        }
    }

    match best {
        None => Award::NoVehicle,
        Some((winner, estimate)) => Award::Winner {
            vehicle:  winner,
            estimate: estimate.clone(),
            losers:   proposals.keys().copied().filter(|&v| v != winner).collect(),
        },
    }
}

/// State of the round currently awaiting proposals.
#[derive(Debug)]
pub struct Round {
    pub task:  Task,
    proposals:  BTreeMap<VehicleId, Proposal>,
    /// Vehicles the CFP reached.  Only they may bid.
    recipients: BTreeSet<VehicleId>,
    started:    Instant,
    deadline:   Instant,
    evaluated:  bool,
}

impl Round {
    pub fn new(
        task: Task,
        recipients: impl IntoIterator<Item = VehicleId>,
        started: Instant,
        deadline: Instant,
    ) -> Self {
        Self {
            task,
            proposals: BTreeMap::new(),
            recipients: recipients.into_iter().collect(),
            started,
            deadline,
            evaluated: false,
        }
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn proposals(&self) -> &BTreeMap<VehicleId, Proposal> {
        &self.proposals
    }

    pub fn is_recipient(&self, vehicle: VehicleId) -> bool {
        self.recipients.contains(&vehicle)
    }

    /// Store a proposal for this round's task.  A vehicle that answers twice
    /// keeps its latest proposal.  Returns `true` for a first answer.
    ///
    /// The caller has checked [`is_recipient`](Self::is_recipient).
    pub fn record(&mut self, proposal: Proposal) -> bool {
        self.proposals.insert(proposal.vehicle_id, proposal).is_none()
    }

    /// Every vehicle the CFP reached has answered.
    pub fn all_responded(&self) -> bool {
        self.recipients.iter().all(|v| self.proposals.contains_key(v))
    }

    /// The round should be evaluated now.
    pub fn is_due(&self, now: Instant) -> bool {
        !self.evaluated && (self.all_responded() || now >= self.deadline)
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    /// Evaluate once.  Every later call returns `None`.
    pub fn close(&mut self) -> Option<Award> {
        if self.evaluated {
            return None;
        }
        self.evaluated = true;
        Some(evaluate(&self.proposals))
    }
}
