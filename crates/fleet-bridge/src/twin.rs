//! The digital twin: one control-session server per vehicle.
//!
//! # Tasks
//!
//! ```text
//!   bus delivery task ──callback──► events ──┐
//!   connection reader (per client) ─────────►│
//!   hop waiter (per assignMission) ─────────►│──► twin actor loop
//!   watchdog interval ──────────────────────►│        │
//!   accept loop ────────────────────────────►┘        ▼
//!                                          client writer (per client)
//! ```
//!
//! All twin state (latest telemetry, client set, staleness, journey
//! counters) is owned by the actor loop.  The only state shared with the bus
//! callback is the [`PendingRegistry`], which is internally locked.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use fleet_core::{now_millis, BridgeConfig, VehicleId};
use fleet_protocol::topics::{command_payload, topic};
use fleet_protocol::{Channel, RawTelemetry, RequestId, SessionFrame, Telemetry, TransportError};

use crate::bus::Bus;
use crate::journey::JourneyTracker;
use crate::pending::PendingRegistry;
use crate::telemetry::{canonicalize, StalenessMonitor};
use crate::{BridgeError, BridgeResult};

type ClientId = u64;

enum TwinEvent {
    Telemetry(RawTelemetry),
    Malformed(String),
    Connected { id: ClientId, peer: SocketAddr, tx: mpsc::Sender<SessionFrame> },
    Frame { id: ClientId, frame: SessionFrame },
    BadFrame { id: ClientId, error: String },
    Disconnected { id: ClientId },
    HopResolved { id: ClientId, request_id: RequestId, outcome: Result<String, TransportError> },
}

/// Bridge between one vehicle's control sessions and its bus topics.
pub struct DigitalTwin {
    vehicle:  VehicleId,
    listener: TcpListener,
    bus:      Arc<dyn Bus>,
    config:   BridgeConfig,
    pending:  PendingRegistry<String>,
}

impl DigitalTwin {
    /// Bind the control-session listener.  Port 0 picks a free port.
    pub async fn bind(
        vehicle: VehicleId,
        addr: SocketAddr,
        bus: Arc<dyn Bus>,
        config: BridgeConfig,
    ) -> BridgeResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| BridgeError::Bind { addr, source })?;
        Ok(Self { vehicle, listener, bus, config, pending: PendingRegistry::new() })
    }

    pub fn local_addr(&self) -> BridgeResult<SocketAddr> {
        Ok(self.listener.local_addr().map_err(TransportError::from)?)
    }

    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    /// Subscribe to telemetry and serve sessions until `shutdown` flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let (events_tx, mut events) = mpsc::unbounded_channel();
        self.subscribe(events_tx.clone());

        let mut actor = TwinActor {
            vehicle:   self.vehicle,
            bus:       self.bus,
            config:    self.config.clone(),
            pending:   self.pending,
            events:    events_tx.clone(),
            clients:   HashMap::new(),
            latest:    None,
            staleness: StalenessMonitor::new(self.config.staleness_threshold(), Instant::now()),
            journey:   JourneyTracker::new(),
        };

        let mut watchdog = tokio::time::interval(self.config.watchdog_interval());
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut next_client: ClientId = 0;

        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(vehicle = %self.vehicle, %addr, "digital twin listening");
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let id = next_client;
                        next_client += 1;
                        tokio::spawn(serve_connection(stream, peer, id, events_tx.clone(), self.config.client_queue));
                    }
                    Err(e) => tracing::warn!(vehicle = %self.vehicle, error = %e, "accept failed"),
                },
                Some(event) = events.recv() => actor.handle(event),
                _ = watchdog.tick() => actor.watchdog(),
            }
        }

        tracing::info!(vehicle = %self.vehicle, clients = actor.clients.len(), "digital twin stopped");
    }

    /// The callback runs on the bus task: it resolves hop waiters and hands
    /// everything else to the actor.
    fn subscribe(&self, events: mpsc::UnboundedSender<TwinEvent>) {
        let vehicle = self.vehicle;
        let pending = self.pending.clone();
        self.bus.subscribe(
            &topic(vehicle, Channel::Telemetry),
            Arc::new(move |_topic: &str, payload: &[u8]| {
                let event = match RawTelemetry::decode(payload) {
                    Ok(raw) => {
                        let t = canonicalize(&raw, vehicle, now_millis());
                        if let (true, Some(node)) = (t.arrived(), &t.current_location) {
                            pending.resolve_label(node, node.clone());
                        }
                        TwinEvent::Telemetry(raw)
                    }
                    Err(e) => TwinEvent::Malformed(e.to_string()),
                };
                let _ = events.send(event);
            }),
        );
    }
}

// ── Actor ─────────────────────────────────────────────────────────────────────

struct TwinActor {
    vehicle:   VehicleId,
    bus:       Arc<dyn Bus>,
    config:    BridgeConfig,
    pending:   PendingRegistry<String>,
    events:    mpsc::UnboundedSender<TwinEvent>,
    clients:   HashMap<ClientId, mpsc::Sender<SessionFrame>>,
    latest:    Option<Telemetry>,
    staleness: StalenessMonitor,
    journey:   JourneyTracker,
}

impl TwinActor {
    fn handle(&mut self, event: TwinEvent) {
        match event {
            TwinEvent::Telemetry(raw) => self.on_telemetry(raw),
            TwinEvent::Malformed(error) => {
                tracing::warn!(vehicle = %self.vehicle, %error, "malformed telemetry");
                self.broadcast(SessionFrame::error(None, format!("malformed telemetry: {error}")));
            }
            TwinEvent::Connected { id, peer, tx } => {
                tracing::info!(vehicle = %self.vehicle, client = id, %peer, "control session opened");
                self.clients.insert(id, tx);
            }
            TwinEvent::Frame { id, frame } => self.on_frame(id, frame),
            TwinEvent::BadFrame { id, error } => {
                tracing::warn!(vehicle = %self.vehicle, client = id, %error, "malformed session frame");
                self.send_to(id, SessionFrame::error(None, format!("malformed frame: {error}")));
            }
            TwinEvent::Disconnected { id } => {
                if self.clients.remove(&id).is_some() {
                    tracing::info!(vehicle = %self.vehicle, client = id, "control session closed");
                }
            }
            TwinEvent::HopResolved { id, request_id, outcome } => match outcome {
                Ok(node) => {
                    tracing::debug!(vehicle = %self.vehicle, request = %request_id, %node, "hop complete");
                    self.send_to(id, SessionFrame::HopComplete { request_id, node });
                }
                Err(e) => {
                    tracing::warn!(vehicle = %self.vehicle, request = %request_id, error = %e, "hop not confirmed");
                    self.send_to(id, SessionFrame::error(Some(request_id), e.to_string()));
                }
            },
        }
    }

    fn on_telemetry(&mut self, raw: RawTelemetry) {
        let now = Instant::now();
        if self.staleness.record(now) {
            tracing::info!(vehicle = %self.vehicle, "telemetry resumed");
        }
        let t = canonicalize(&raw, self.vehicle, now_millis());
        tracing::trace!(vehicle = %self.vehicle, location = t.location_or_unknown(), progress = t.progress, "telemetry");
        self.journey.observe(&t);
        self.latest = Some(t.clone());
        self.broadcast(SessionFrame::VehicleData { data: t });
    }

    fn on_frame(&mut self, id: ClientId, frame: SessionFrame) {
        match frame {
            SessionFrame::AssignMission { destination_node, request_id } => {
                self.assign_mission(id, destination_node, request_id);
            }
            SessionFrame::GetStatus { request_id } => {
                let now = Instant::now();
                self.send_to(id, SessionFrame::Status {
                    request_id,
                    telemetry: self.latest.clone(),
                    stale:     self.staleness.is_stale(now),
                    journey:   self.journey.summary(),
                });
            }
            SessionFrame::MissionComplete { task_id } => {
                self.journey.mission_completed();
                tracing::info!(vehicle = %self.vehicle, task = ?task_id, "mission complete");
            }
            other => {
                let kind = frame_type(&other);
                self.send_to(id, SessionFrame::error(None, format!("unexpected frame type {kind}")));
            }
        }
    }

    /// Register the slot before publishing so an immediate arrival report
    /// cannot be missed.
    fn assign_mission(&mut self, id: ClientId, destination: String, request_id: RequestId) {
        let handle = self.pending.register(request_id.clone(), destination.clone(), self.config.hop_timeout());
        let published = self
            .bus
            .publish(&topic(self.vehicle, Channel::Command), command_payload(&destination));
        if let Err(e) = published {
            drop(handle);
            tracing::warn!(vehicle = %self.vehicle, request = %request_id, error = %e, "hop publish failed");
            self.send_to(id, SessionFrame::error(Some(request_id), e.to_string()));
            return;
        }

        self.journey.mission_forwarded();
        tracing::debug!(vehicle = %self.vehicle, request = %request_id, %destination, "hop forwarded");
        self.send_to(id, SessionFrame::TaskAck { request_id: request_id.clone() });

        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = handle.wait().await;
            let _ = events.send(TwinEvent::HopResolved { id, request_id, outcome });
        });
    }

    fn watchdog(&mut self) {
        let now = Instant::now();
        if self.staleness.check(now) {
            tracing::warn!(
                vehicle = %self.vehicle,
                silent_ms = self.staleness.silence(now).as_millis() as u64,
                "telemetry stale"
            );
        }
        let swept = self.pending.sweep_expired();
        if swept > 0 {
            tracing::debug!(vehicle = %self.vehicle, swept, "expired pending requests removed");
        }
    }

    fn send_to(&mut self, id: ClientId, frame: SessionFrame) {
        let Some(tx) = self.clients.get(&id) else { return };
        if let Err(e) = tx.try_send(frame) {
            tracing::warn!(vehicle = %self.vehicle, client = id, error = %e, "client unresponsive, pruned");
            self.clients.remove(&id);
        }
    }

    fn broadcast(&mut self, frame: SessionFrame) {
        let vehicle = self.vehicle;
        self.clients.retain(|id, tx| match tx.try_send(frame.clone()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(vehicle = %vehicle, client = id, error = %e, "client unresponsive, pruned");
                false
            }
        });
    }
}

fn frame_type(frame: &SessionFrame) -> &'static str {
    match frame {
        SessionFrame::AssignMission { .. }   => "assignMission",
        SessionFrame::TaskAck { .. }         => "taskAck",
        SessionFrame::VehicleData { .. }     => "vehicleData",
        SessionFrame::HopComplete { .. }     => "hopComplete",
        SessionFrame::GetStatus { .. }       => "getStatus",
        SessionFrame::Status { .. }          => "status",
        SessionFrame::MissionComplete { .. } => "missionComplete",
        SessionFrame::Error { .. }           => "error",
    }
}

// ── Connections ───────────────────────────────────────────────────────────────

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    id: ClientId,
    events: mpsc::UnboundedSender<TwinEvent>,
    queue: usize,
) {
    let (read, write) = stream.into_split();
    let (tx, rx) = mpsc::channel(queue);
    if events.send(TwinEvent::Connected { id, peer, tx }).is_err() {
        return;
    }
    tokio::spawn(write_frames(write, rx, id));

    let mut lines = BufReader::new(read).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => {
                let event = match SessionFrame::decode_line(&line) {
                    Ok(frame) => TwinEvent::Frame { id, frame },
                    Err(e) => TwinEvent::BadFrame { id, error: e.to_string() },
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(client = id, error = %e, "session read failed");
                break;
            }
        }
    }
    let _ = events.send(TwinEvent::Disconnected { id });
}

/// Drains the client's queue onto the socket.  Ends on the first write
/// failure, which closes the queue and gets the client pruned.
async fn write_frames(mut write: OwnedWriteHalf, mut rx: mpsc::Receiver<SessionFrame>, id: ClientId) {
    while let Some(frame) = rx.recv().await {
        let line = match frame.encode_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(client = id, error = %e, "frame encoding failed");
                continue;
            }
        };
        if let Err(e) = write.write_all(line.as_bytes()).await {
            tracing::debug!(client = id, error = %e, "session write failed");
            break;
        }
    }
}
