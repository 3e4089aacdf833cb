//! The coordinator state machine and its actor loop.

use std::collections::{BTreeMap, HashSet};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use fleet_core::{CoordinatorConfig, TaskId, VehicleId, now_millis};
use fleet_protocol::{
    Acceptance, Address, Assignment, CallForProposal, Completion, Directory, Envelope, Mailbox, Message,
    Proposal, ProtocolError, Rejection,
};

use crate::observer::CoordinatorObserver;
use crate::round::{Award, Round, RoundPhase};
use crate::task::{ActiveAssignment, Task, TaskState};

/// What a timer tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new round started for this task.
    Started(TaskId),
    /// The previous round is still collecting proposals.
    Busy,
    /// The in-flight cap is reached; waiting for completions.
    Paused { in_flight: usize },
    /// The task limit is reached; waiting for outstanding assignments.
    Draining { in_flight: usize },
    /// The task limit is reached and nothing is outstanding.
    Drained,
}

// ── CoordinatorCore ───────────────────────────────────────────────────────────

/// Synchronous coordinator state.  Every method that depends on time takes
/// `now` explicitly; [`Coordinator`] supplies it from the tokio clock.
pub struct CoordinatorCore<O: CoordinatorObserver> {
    config:       CoordinatorConfig,
    directory:    Directory,
    destinations: Vec<String>,
    rng:          SmallRng,
    observer:     O,

    round:        Option<Round>,
    active:       BTreeMap<TaskId, ActiveAssignment>,
    completed:    HashSet<TaskId>,
    /// Completed and rejected tasks, in the order they finished.
    archive:      Vec<Task>,
    issued:       u64,
    drained:      bool,
}

impl<O: CoordinatorObserver> CoordinatorCore<O> {
    /// Use [`CoordinatorBuilder`][crate::CoordinatorBuilder]; it validates
    /// the inputs.
    pub(crate) fn new(
        config: CoordinatorConfig,
        directory: Directory,
        destinations: Vec<String>,
        rng: SmallRng,
        observer: O,
    ) -> Self {
        Self {
            config,
            directory,
            destinations,
            rng,
            observer,
            round: None,
            active: BTreeMap::new(),
            completed: HashSet::new(),
            archive: Vec::new(),
            issued: 0,
            drained: false,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn phase(&self) -> RoundPhase {
        match &self.round {
            None => RoundPhase::Idle,
            Some(r) if r.is_evaluated() => RoundPhase::Evaluating,
            Some(_) => RoundPhase::AwaitingProposals,
        }
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn active(&self) -> &BTreeMap<TaskId, ActiveAssignment> {
        &self.active
    }

    pub fn is_completed(&self, task: &TaskId) -> bool {
        self.completed.contains(task)
    }

    pub fn archive(&self) -> &[Task] {
        &self.archive
    }

    pub fn tasks_issued(&self) -> u64 {
        self.issued
    }

    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    /// When the current round must be evaluated at the latest.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.round.as_ref().filter(|r| !r.is_evaluated()).map(Round::deadline)
    }

    /// The task limit was reached and every assignment has completed.
    pub fn is_drained(&self) -> bool {
        self.drained
    }

    fn limit_reached(&self) -> bool {
        self.config.max_tasks.is_some_and(|max| self.issued >= max)
    }

    // ── Timer ─────────────────────────────────────────────────────────────

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.round.is_some() {
            tracing::debug!("round still awaiting proposals, tick skipped");
            return TickOutcome::Busy;
        }

        let in_flight = self.active.len();
        if self.limit_reached() {
            return if in_flight == 0 {
                self.mark_drained();
                TickOutcome::Drained
            } else {
                tracing::debug!(in_flight, "task limit reached, draining");
                TickOutcome::Draining { in_flight }
            };
        }
        if self.config.max_in_flight.is_some_and(|cap| in_flight >= cap) {
            tracing::debug!(in_flight, "in-flight cap reached, pausing");
            return TickOutcome::Paused { in_flight };
        }

        TickOutcome::Started(self.start_round(now))
    }

    fn start_round(&mut self, now: Instant) -> TaskId {
        let destination = self.destinations.choose(&mut self.rng).cloned().unwrap_or_default();
        let mut task = Task::new(destination);
        self.issued += 1;

        let cfp = CallForProposal {
            task_id:          task.id.clone(),
            destination_node: task.destination.clone(),
            timestamp:        now_millis(),
        };
        let mut recipients = Vec::new();
        for vehicle in self.directory.vehicles() {
            match self.directory.send(Address::Coordinator, Address::Vehicle(vehicle), cfp.clone()) {
                Ok(()) => recipients.push(vehicle),
                Err(e) => tracing::warn!(vehicle = %vehicle, error = %e, "CFP not delivered"),
            }
        }

        task.state = TaskState::Proposed;
        tracing::info!(
            task = %task.id,
            destination = %task.destination,
            recipients = recipients.len(),
            issued = self.issued,
            "call for proposals"
        );
        self.observer.on_round_start(&task, recipients.len());

        let id = task.id.clone();
        let deadline = now + self.config.response_timeout();
        self.round = Some(Round::new(task, recipients, now, deadline));
        // Nobody to wait for.
        self.poll(now);
        id
    }

    // ── Messages ──────────────────────────────────────────────────────────

    pub fn handle(&mut self, env: Envelope, now: Instant) {
        match env.message {
            Message::Proposal(p) => self.on_proposal(p, now),
            Message::Acceptance(a) => self.on_acceptance(a),
            Message::Completion(c) => self.on_completion(c),
            Message::NodeUpdate(u) => {
                tracing::debug!(
                    vehicle = %u.vehicle_id,
                    node = %u.current_node,
                    next = ?u.next_node,
                    progress = u.progress,
                    "node update"
                );
                self.observer.on_node_update(&u);
            }
            other => {
                tracing::warn!(from = %env.from, kind = other.kind(), "unexpected message discarded");
            }
        }
    }

    fn on_proposal(&mut self, proposal: Proposal, now: Instant) {
        let Some(round) = self.round.as_mut().filter(|r| r.task.id == proposal.task_id && !r.is_evaluated()) else {
            let e = ProtocolError::StaleTask {
                got:     proposal.task_id,
                current: self.round.as_ref().map(|r| r.task.id.clone()),
            };
            tracing::info!(vehicle = %proposal.vehicle_id, error = %e, "proposal discarded");
            return;
        };
        if !round.is_recipient(proposal.vehicle_id) {
            let e = ProtocolError::UnexpectedSender { vehicle: proposal.vehicle_id, task: proposal.task_id };
            tracing::warn!(error = %e, "proposal discarded");
            return;
        }

        let elapsed = now.saturating_duration_since(round.started());
        tracing::debug!(
            vehicle = %proposal.vehicle_id,
            task = %proposal.task_id,
            busy = proposal.is_busy,
            eta = proposal.estimate.as_ref().map(|e| e.estimated_time),
            "proposal received"
        );
        self.observer.on_proposal(&round.task, &proposal, elapsed);
        if !round.record(proposal) {
            tracing::debug!(task = %round.task.id, "vehicle answered twice, keeping latest proposal");
        }
        self.poll(now);
    }

    /// Evaluate the current round if every vehicle has answered or its
    /// deadline has passed.
    pub fn poll(&mut self, now: Instant) {
        let Some(round) = self.round.as_mut() else { return };
        if !round.is_due(now) {
            return;
        }
        let timed_out = !round.all_responded();
        let respondents = round.proposals().len();
        let Some(award) = round.close() else { return };
        let Some(mut round) = self.round.take() else { return };
        if timed_out {
            tracing::info!(task = %round.task.id, respondents, "response timeout, evaluating");
        }

        match award {
            Award::NoVehicle => {
                round.task.state = TaskState::RejectedNoVehicle;
                tracing::warn!(task = %round.task.id, respondents, "no available vehicle, task rejected");
                self.observer.on_no_vehicle(&round.task, respondents);
                self.archive.push(round.task);
            }
            Award::Winner { vehicle, estimate, losers } => {
                let task_id = round.task.id.clone();
                self.send(vehicle, Assignment {
                    task_id:          task_id.clone(),
                    destination_node: round.task.destination.clone(),
                    vehicle_id:       vehicle,
                });
                for &loser in &losers {
                    self.send(loser, Rejection { task_id: task_id.clone(), vehicle_id: loser });
                }
                round.task.state = TaskState::Assigned;
                tracing::info!(
                    task = %task_id,
                    vehicle = %vehicle,
                    eta = estimate.estimated_time,
                    distance = estimate.distance,
                    rejected = losers.len(),
                    "task allocated"
                );
                self.observer.on_allocation(&round.task, vehicle, &estimate, &losers);
                self.active.insert(task_id, ActiveAssignment {
                    task:           round.task,
                    vehicle,
                    estimated_time: estimate.estimated_time,
                    started_at:     now_millis(),
                    accepted:       None,
                });
            }
        }
    }

    fn on_acceptance(&mut self, a: Acceptance) {
        self.observer.on_acceptance(&a);
        let Some(assignment) = self.active.get_mut(&a.task_id).filter(|s| s.vehicle == a.vehicle_id) else {
            tracing::info!(vehicle = %a.vehicle_id, task = %a.task_id, "acceptance for unknown assignment");
            return;
        };
        assignment.accepted = Some(a.accepted);
        if a.accepted {
            assignment.task.state = TaskState::Executing;
            tracing::info!(vehicle = %a.vehicle_id, task = %a.task_id, "assignment accepted");
        } else {
            tracing::warn!(vehicle = %a.vehicle_id, task = %a.task_id, "assignment declined, task stays assigned");
        }
    }

    fn on_completion(&mut self, c: Completion) {
        if self.completed.contains(&c.task_id) {
            tracing::debug!(vehicle = %c.vehicle_id, task = %c.task_id, "duplicate completion ignored");
            return;
        }
        let matches = self.active.get(&c.task_id).is_some_and(|a| a.vehicle == c.vehicle_id);
        if !matches {
            tracing::warn!(vehicle = %c.vehicle_id, task = %c.task_id, "completion for unknown assignment");
            return;
        }
        let Some(mut assignment) = self.active.remove(&c.task_id) else { return };

        assignment.task.state = TaskState::Completed;
        tracing::info!(
            vehicle = %c.vehicle_id,
            task = %c.task_id,
            node = %c.final_node,
            success = c.success,
            in_flight = self.active.len(),
            "task completed"
        );
        self.observer.on_completion(&assignment, &c);
        self.completed.insert(c.task_id);
        self.archive.push(assignment.task);

        if self.limit_reached() && self.active.is_empty() && self.round.is_none() {
            self.mark_drained();
        }
    }

    fn mark_drained(&mut self) {
        if self.drained {
            return;
        }
        self.drained = true;
        tracing::info!(issued = self.issued, completed = self.completed.len(), "all tasks finished");
        self.observer.on_drained(self.issued, self.completed.len());
    }

    fn send(&self, vehicle: VehicleId, message: impl Into<Message>) {
        if let Err(e) = self.directory.send(Address::Coordinator, Address::Vehicle(vehicle), message) {
            tracing::warn!(vehicle = %vehicle, error = %e, "send failed");
        }
    }
}

// ── Coordinator actor ─────────────────────────────────────────────────────────

pub struct Coordinator<O: CoordinatorObserver> {
    core:    CoordinatorCore<O>,
    mailbox: Mailbox,
}

impl<O: CoordinatorObserver> Coordinator<O> {
    pub(crate) fn new(core: CoordinatorCore<O>, mailbox: Mailbox) -> Self {
        Self { core, mailbox }
    }

    pub fn core(&self) -> &CoordinatorCore<O> {
        &self.core
    }

    /// Run rounds until drained, `shutdown` flips, or the mailbox closes.
    /// The first round starts immediately.  Returns the final state.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> CoordinatorCore<O> {
        let mut ticker = tokio::time::interval(self.core.config.round_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            vehicles = self.core.directory.vehicles().len(),
            destinations = self.core.destinations.len(),
            max_tasks = ?self.core.config.max_tasks,
            "coordinator started"
        );
        while !self.core.is_drained() {
            let deadline = self.core.next_deadline();
            tokio::select! {
                _ = shutdown.changed() => break,
                env = self.mailbox.recv() => match env {
                    Some(env) => self.core.handle(env, Instant::now()),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.core.tick(Instant::now());
                }
                _ = sleep_until_opt(deadline), if deadline.is_some() => self.core.poll(Instant::now()),
            }
        }
        tracing::info!(
            issued = self.core.issued,
            in_flight = self.core.active.len(),
            "coordinator stopped"
        );
        self.core
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    }
}
