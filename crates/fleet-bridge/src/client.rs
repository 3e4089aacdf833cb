//! Agent-side end of a control session.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

use fleet_core::VehicleId;
use fleet_protocol::{JourneySummary, RequestId, SessionFrame, Telemetry, TransportError};

use crate::pending::PendingRegistry;
use crate::{BridgeError, BridgeResult};

/// Something the bridge told us that was not a reply to an `assignMission`.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    Telemetry(Telemetry),
    HopComplete { request_id: RequestId, node: String },
    /// A hop was forwarded but never confirmed by the vehicle.
    HopFailed { request_id: RequestId, message: String },
    Status { telemetry: Option<Telemetry>, stale: bool, journey: JourneySummary },
    Error(String),
    Disconnected,
}

/// Ack outcome: `Err` carries the bridge's error message.
type AckResult = Result<(), String>;

pub struct BridgeClient {
    vehicle:     VehicleId,
    writer:      Mutex<OwnedWriteHalf>,
    acks:        PendingRegistry<AckResult>,
    ack_timeout: Duration,
}

impl BridgeClient {
    /// Connect and start the reader task.  Events other than acks arrive on
    /// the returned receiver; it yields `Disconnected` once and then closes.
    pub async fn connect(
        addr: SocketAddr,
        vehicle: VehicleId,
        ack_timeout: Duration,
    ) -> BridgeResult<(BridgeClient, mpsc::UnboundedReceiver<BridgeEvent>)> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| BridgeError::Connect { addr, source })?;
        let (read, write) = stream.into_split();
        let acks = PendingRegistry::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tokio::spawn(read_frames(read, vehicle, acks.clone(), events_tx));
        tracing::debug!(vehicle = %vehicle, %addr, "bridge session connected");

        let client = BridgeClient { vehicle, writer: Mutex::new(write), acks, ack_timeout };
        Ok((client, events_rx))
    }

    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    /// Command a single hop and wait for the bridge's `taskAck`.
    ///
    /// The ack means "forwarded to the bus"; arrival is reported later by
    /// telemetry.  Fails with `Timeout` if no ack arrives within the
    /// configured bound.
    pub async fn assign_hop(&self, node: &str) -> Result<RequestId, TransportError> {
        let request_id = uuid::Uuid::new_v4().simple().to_string();
        let handle = self.acks.register(request_id.clone(), node, self.ack_timeout);
        self.send(&SessionFrame::AssignMission {
            destination_node: node.to_owned(),
            request_id:       request_id.clone(),
        })
        .await?;

        match handle.wait().await? {
            Ok(()) => Ok(request_id),
            Err(message) => {
                tracing::warn!(vehicle = %self.vehicle, request = %request_id, %message, "bridge refused hop");
                Err(TransportError::Disconnected)
            }
        }
    }

    pub async fn mission_complete(&self, task_id: &str) -> Result<(), TransportError> {
        self.send(&SessionFrame::MissionComplete { task_id: Some(task_id.to_owned()) }).await
    }

    /// Ask for a `status` frame; it arrives as [`BridgeEvent::Status`].
    pub async fn request_status(&self) -> Result<(), TransportError> {
        self.send(&SessionFrame::GetStatus { request_id: None }).await
    }

    async fn send(&self, frame: &SessionFrame) -> Result<(), TransportError> {
        let line = frame.encode_line()?;
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

async fn read_frames(
    read: OwnedReadHalf,
    vehicle: VehicleId,
    acks: PendingRegistry<AckResult>,
    events: mpsc::UnboundedSender<BridgeEvent>,
) {
    let mut lines = BufReader::new(read).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(vehicle = %vehicle, error = %e, "bridge session read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let frame = match SessionFrame::decode_line(&line) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(vehicle = %vehicle, error = %e, "malformed frame from bridge");
                continue;
            }
        };
        let event = match frame {
            SessionFrame::TaskAck { request_id } => {
                if !acks.resolve(&request_id, Ok(())) {
                    tracing::debug!(vehicle = %vehicle, request = %request_id, "late or unknown ack");
                }
                continue;
            }
            SessionFrame::Error { request_id: Some(request_id), message } => {
                if acks.resolve(&request_id, Err(message.clone())) {
                    continue;
                }
                BridgeEvent::HopFailed { request_id, message }
            }
            SessionFrame::Error { request_id: None, message } => BridgeEvent::Error(message),
            SessionFrame::VehicleData { data } => BridgeEvent::Telemetry(data),
            SessionFrame::HopComplete { request_id, node } => BridgeEvent::HopComplete { request_id, node },
            SessionFrame::Status { telemetry, stale, journey, .. } => BridgeEvent::Status { telemetry, stale, journey },
            other => {
                tracing::debug!(vehicle = %vehicle, frame = ?other, "ignoring client-bound frame");
                continue;
            }
        };
        if events.send(event).is_err() {
            break;
        }
    }
    acks.clear();
    let _ = events.send(BridgeEvent::Disconnected);
}
