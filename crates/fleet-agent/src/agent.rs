//! The vehicle agent actor.
//!
//! # Loop
//!
//! ```text
//!   mailbox (protocol)  ──┐
//!   bridge events       ──┤
//!   hop outcomes        ──┼──► VehicleAgent (owns VehicleState)
//!   status interval     ──┤
//!   shutdown            ──┘
//! ```
//!
//! Hop commands run in spawned tasks so a slow acknowledgment never stops
//! the agent from answering calls for proposals; their results come back as
//! [`HopOutcome`]s.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use fleet_bridge::BridgeEvent;
use fleet_core::{AgentConfig, TaskId, VehicleId};
use fleet_protocol::{
    Acceptance, Address, Assignment, CallForProposal, Completion, Directory, Envelope, Estimate, Mailbox,
    Message, NodeUpdate, Proposal, Telemetry, TransportError,
};
use fleet_routing::{RoutingEngine, RoutingError};

use crate::hop::HopDispatcher;
use crate::state::{AgentPhase, TelemetryOutcome, VehicleState};
use crate::AgentResult;

/// Result of one spawned hop command.
#[derive(Debug)]
pub struct HopOutcome {
    pub task:   TaskId,
    pub node:   String,
    pub result: Result<(), TransportError>,
}

pub struct VehicleAgent<H: HopDispatcher> {
    state:       VehicleState,
    engine:      Arc<RoutingEngine>,
    directory:   Directory,
    hops:        Arc<H>,
    config:      AgentConfig,
    outcomes:    mpsc::UnboundedSender<HopOutcome>,
    /// Taken by `run`.
    outcomes_rx: Option<mpsc::UnboundedReceiver<HopOutcome>>,
}

impl<H: HopDispatcher> VehicleAgent<H> {
    /// The vehicle starts idle on its roster start node.
    pub fn new(
        id: VehicleId,
        engine: Arc<RoutingEngine>,
        directory: Directory,
        hops: Arc<H>,
        config: AgentConfig,
    ) -> AgentResult<Self> {
        let spec = engine.roster().get(id).ok_or(RoutingError::UnknownVehicle(id))?;
        let state = VehicleState::new(id, spec.start_node.clone());
        let (outcomes, outcomes_rx) = mpsc::unbounded_channel();
        Ok(Self { state, engine, directory, hops, config, outcomes, outcomes_rx: Some(outcomes_rx) })
    }

    pub fn id(&self) -> VehicleId {
        self.state.id
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    fn address(&self) -> Address {
        Address::Vehicle(self.state.id)
    }

    /// Serve until `shutdown` flips or the mailbox closes.
    pub async fn run(
        mut self,
        mut mailbox: Mailbox,
        mut bridge: mpsc::UnboundedReceiver<BridgeEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let Some(mut outcomes) = self.outcomes_rx.take() else { return };
        let mut status = tokio::time::interval(self.config.status_interval());
        status.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut bridge_open = true;

        tracing::info!(vehicle = %self.state.id, node = %self.state.current_node, "vehicle agent started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                env = mailbox.recv() => match env {
                    Some(env) => self.handle_message(env),
                    None => break,
                },
                ev = bridge.recv(), if bridge_open => match ev {
                    Some(ev) => self.handle_bridge(ev),
                    None => bridge_open = false,
                },
                Some(outcome) = outcomes.recv() => self.handle_hop_outcome(outcome),
                _ = status.tick() => self.report_status(),
            }
        }
        tracing::info!(vehicle = %self.state.id, "vehicle agent stopped");
    }

    // ── Protocol messages ─────────────────────────────────────────────────────

    pub fn handle_message(&mut self, env: Envelope) {
        match env.message {
            Message::CallForProposal(cfp) => self.on_cfp(env.from, cfp),
            Message::Assignment(a) if a.vehicle_id == self.state.id => self.on_assignment(env.from, a),
            Message::Rejection(r) if r.vehicle_id == self.state.id => {
                tracing::debug!(vehicle = %self.state.id, task = %r.task_id, "proposal rejected");
            }
            other => {
                tracing::warn!(vehicle = %self.state.id, from = %env.from, kind = other.kind(), "unexpected message discarded");
            }
        }
    }

    fn on_cfp(&mut self, from: Address, cfp: CallForProposal) {
        let id = self.state.id;
        let here = self.state.current_node.clone();
        let proposal = if self.state.busy {
            Proposal::busy(cfp.task_id, id, here)
        } else {
            match self.engine.find_path(id, &here, &cfp.destination_node, self.config.criterion) {
                Ok(plan) => Proposal::bid(cfp.task_id, id, here, Estimate {
                    estimated_time: plan.travel_time,
                    distance:       plan.distance,
                    carbon:         plan.carbon,
                    cost:           plan.cost,
                    planned_path:   plan.path,
                }),
                Err(e) => {
                    tracing::debug!(vehicle = %id, task = %cfp.task_id, error = %e, "cannot price task, bidding busy");
                    Proposal::busy(cfp.task_id, id, here)
                }
            }
        };
        self.send(from, proposal);
    }

    fn on_assignment(&mut self, from: Address, a: Assignment) {
        let id = self.state.id;
        if self.state.busy {
            tracing::info!(vehicle = %id, task = %a.task_id, current = ?self.state.task_id, "busy, declining assignment");
            self.send(from, Acceptance { task_id: a.task_id, vehicle_id: id, accepted: false, planned_path: None });
            return;
        }

        self.state.assign(a.task_id.clone(), a.destination_node.clone());
        let plan = self
            .engine
            .find_path(id, &self.state.current_node, &a.destination_node, self.config.criterion);
        let plan = match plan {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(vehicle = %id, task = %a.task_id, error = %e, "planning failed, declining assignment");
                self.state.reset();
                self.send(from, Acceptance { task_id: a.task_id, vehicle_id: id, accepted: false, planned_path: None });
                return;
            }
        };

        self.state.execute(plan.path.clone());
        tracing::info!(
            vehicle = %id,
            task = %a.task_id,
            destination = %a.destination_node,
            hops = plan.path.len().saturating_sub(1),
            eta = plan.travel_time,
            "assignment accepted"
        );
        self.send(from, Acceptance {
            task_id:      a.task_id,
            vehicle_id:   id,
            accepted:     true,
            planned_path: Some(plan.path),
        });

        if self.state.plan_is_trivial() {
            self.state.phase = AgentPhase::Completed;
            self.complete();
        } else {
            self.dispatch_next();
        }
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    fn dispatch_next(&mut self) {
        let (Some(task), Some(node)) = (self.state.task_id.clone(), self.state.next_target()) else {
            return;
        };
        let node = node.to_owned();
        tracing::debug!(vehicle = %self.state.id, task = %task, %node, "dispatching hop");

        let hops = self.hops.clone();
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let result = hops.dispatch(node.clone()).await;
            let _ = outcomes.send(HopOutcome { task, node, result });
        });
    }

    /// A failed acknowledgment keeps the path: the hop may still be in
    /// flight and its arrival will be seen in telemetry.
    pub fn handle_hop_outcome(&mut self, outcome: HopOutcome) {
        let vehicle = self.state.id;
        match outcome.result {
            Ok(()) => tracing::debug!(vehicle = %vehicle, task = %outcome.task, node = %outcome.node, "hop acknowledged"),
            Err(e) => tracing::warn!(
                vehicle = %vehicle,
                task = %outcome.task,
                node = %outcome.node,
                error = %e,
                "hop not acknowledged, keeping planned path"
            ),
        }
    }

    pub fn handle_bridge(&mut self, event: BridgeEvent) {
        let vehicle = self.state.id;
        match event {
            BridgeEvent::Telemetry(t) => self.on_telemetry(&t),
            BridgeEvent::HopComplete { request_id, node } => {
                tracing::debug!(vehicle = %vehicle, request = %request_id, %node, "bridge confirmed hop");
            }
            BridgeEvent::HopFailed { request_id, message } => {
                tracing::warn!(vehicle = %vehicle, request = %request_id, %message, "bridge reported hop failure");
            }
            BridgeEvent::Status { stale, journey, .. } => {
                tracing::debug!(vehicle = %vehicle, stale, distance = journey.distance, "bridge status");
            }
            BridgeEvent::Error(message) => tracing::warn!(vehicle = %vehicle, %message, "bridge error"),
            BridgeEvent::Disconnected => tracing::error!(vehicle = %vehicle, "bridge session lost"),
        }
    }

    fn on_telemetry(&mut self, t: &Telemetry) {
        let vehicle = self.state.id;
        match self.state.observe(t, self.engine.network()) {
            Ok(TelemetryOutcome::Advanced { node, next }) => {
                tracing::info!(vehicle = %vehicle, %node, %next, "waypoint reached");
                self.dispatch_next();
            }
            Ok(TelemetryOutcome::Finished { node }) => {
                tracing::info!(vehicle = %vehicle, %node, "final node reached");
                self.complete();
            }
            Ok(TelemetryOutcome::Relocated { node }) => {
                tracing::debug!(vehicle = %vehicle, %node, "idle vehicle relocated");
            }
            Ok(TelemetryOutcome::Progress | TelemetryOutcome::Unchanged) => {}
            Err(e) => tracing::warn!(vehicle = %vehicle, error = %e, "inconsistent telemetry discarded"),
        }
    }

    /// Report Completion and return to idle.
    fn complete(&mut self) {
        let Some(task) = self.state.task_id.clone() else {
            self.state.reset();
            return;
        };
        let vehicle = self.state.id;
        self.send(Address::Coordinator, Completion {
            task_id:    task.clone(),
            vehicle_id: vehicle,
            final_node: self.state.current_node.clone(),
            success:    true,
        });
        tracing::info!(vehicle = %vehicle, task = %task, node = %self.state.current_node, "task completed");
        self.state.reset();

        let hops = self.hops.clone();
        tokio::spawn(async move {
            if let Err(e) = hops.mission_complete(task).await {
                tracing::debug!(vehicle = %vehicle, error = %e, "missionComplete not delivered");
            }
        });
    }

    /// Periodic NodeUpdate while executing.
    pub fn report_status(&mut self) {
        if self.state.phase != AgentPhase::Executing {
            return;
        }
        self.send(Address::Coordinator, NodeUpdate {
            vehicle_id:   self.state.id,
            current_node: self.state.current_node.clone(),
            next_node:    self.state.next_target().map(str::to_owned),
            progress:     self.state.progress,
        });
    }

    fn send(&self, to: Address, message: impl Into<Message>) {
        if let Err(e) = self.directory.send(self.address(), to, message) {
            tracing::warn!(vehicle = %self.state.id, error = %e, "send failed");
        }
    }
}
