//! Simulated vehicle: the far side of a digital twin.
//!
//! Listens on `vehicle/{id}/command-instruction`, drives in a straight line
//! to the commanded node at roster speed, and publishes `telemetry-update`
//! every step.  While idle it keeps publishing its position as a heartbeat.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use fleet_bridge::Bus;
use fleet_core::{Point2, VehicleId};
use fleet_protocol::topics::{parse_command, topic};
use fleet_protocol::{Channel, RawNode, RawTelemetry};
use fleet_routing::{NetworkGraph, VehicleSpec};

#[derive(Debug, Clone, PartialEq)]
struct Leg {
    from:      String,
    to:        String,
    origin:    Point2,
    target:    Point2,
    travelled: f64,
}

impl Leg {
    fn length(&self) -> f64 {
        self.origin.distance(self.target)
    }

    fn progress(&self) -> f64 {
        let len = self.length();
        if len <= f64::EPSILON { 100.0 } else { (self.travelled / len * 100.0).min(100.0) }
    }
}

pub struct SimulatedVehicle {
    id:       VehicleId,
    speed:    f64,
    node:     String,
    position: Point2,
    leg:      Option<Leg>,
    network:  Arc<NetworkGraph>,
    bus:      Arc<dyn Bus>,
    step:     Duration,
}

impl SimulatedVehicle {
    /// Place the vehicle on its roster start node.
    pub fn new(spec: &VehicleSpec, network: Arc<NetworkGraph>, bus: Arc<dyn Bus>, step: Duration) -> Self {
        let position = network.position_of(&spec.start_node).unwrap_or_default();
        Self {
            id: spec.id,
            speed: spec.speed,
            node: spec.start_node.clone(),
            position,
            leg: None,
            network,
            bus,
            step,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let (commands_tx, mut commands) = mpsc::unbounded_channel();
        self.bus.subscribe(
            &topic(self.id, Channel::Command),
            Arc::new(move |_topic: &str, payload: &[u8]| {
                let _ = commands_tx.send(parse_command(payload));
            }),
        );

        let mut ticker = tokio::time::interval(self.step);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::debug!(vehicle = %self.id, node = %self.node, "simulated vehicle started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                Some(command) = commands.recv() => match command {
                    Some(node) => self.command(node),
                    None => tracing::warn!(vehicle = %self.id, "unreadable command ignored"),
                },
                _ = ticker.tick() => {
                    self.advance(self.step.as_secs_f64());
                    self.publish();
                }
            }
        }
    }

    fn command(&mut self, node: String) {
        let Some(target) = self.network.position_of(&node) else {
            tracing::warn!(vehicle = %self.id, %node, "command for unknown node ignored");
            return;
        };
        // A new command replaces the current leg from where the vehicle is.
        let from = match &self.leg {
            Some(leg) => leg.from.clone(),
            None => self.node.clone(),
        };
        tracing::debug!(vehicle = %self.id, %from, to = %node, "leg started");
        self.leg = Some(Leg { from, to: node, origin: self.position, target, travelled: 0.0 });
        self.publish();
    }

    fn advance(&mut self, secs: f64) {
        let Some(leg) = self.leg.as_mut() else { return };
        leg.travelled += self.speed * secs;
        let t = leg.progress() / 100.0;
        self.position = leg.origin.lerp(leg.target, t);
    }

    fn publish(&mut self) {
        let finished = self.leg.as_ref().is_some_and(|leg| leg.progress() >= 100.0);
        let raw = match self.leg.take() {
            Some(leg) if finished => {
                tracing::debug!(vehicle = %self.id, node = %leg.to, "leg finished");
                self.node = leg.to.clone();
                self.position = leg.target;
                RawTelemetry {
                    progress:          Some(100.0),
                    current_node:      Some(RawNode::Name(leg.to.clone())),
                    next_location:     Some(leg.to),
                    previous_location: Some(leg.from),
                    x_coordinate:      Some(self.position.x),
                    y_coordinate:      Some(self.position.y),
                }
            }
            Some(leg) => {
                // In transit the reported node is the one just left.
                let raw = RawTelemetry {
                    progress:          Some(leg.progress()),
                    next_location:     Some(leg.to.clone()),
                    previous_location: Some(leg.from.clone()),
                    current_node:      Some(RawNode::Name(leg.from.clone())),
                    x_coordinate:      Some(self.position.x),
                    y_coordinate:      Some(self.position.y),
                };
                self.leg = Some(leg);
                raw
            }
            None => RawTelemetry {
                progress:          Some(100.0),
                next_location:     None,
                previous_location: None,
                current_node:      Some(RawNode::Name(self.node.clone())),
                x_coordinate:      Some(self.position.x),
                y_coordinate:      Some(self.position.y),
            },
        };

        let result = raw.encode().and_then(|payload| self.bus.publish(&topic(self.id, Channel::Telemetry), payload));
        if let Err(e) = result {
            tracing::warn!(vehicle = %self.id, error = %e, "telemetry not published");
        }
    }
}
