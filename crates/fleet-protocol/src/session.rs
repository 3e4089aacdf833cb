//! Control-session framing.
//!
//! The session between a vehicle agent (or any operator tool) and its bridge
//! is newline-delimited JSON.  Each line is one [`SessionFrame`] carrying a
//! `type` discriminator.  A line that fails to decode is answered with an
//! `error` frame; the session stays open.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Telemetry, TransportError};

/// Correlation id chosen by the requester.
pub type RequestId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionFrame {
    /// Client → bridge: command a single hop.
    #[serde(rename_all = "camelCase")]
    AssignMission { destination_node: String, request_id: RequestId },

    /// Bridge → client: the hop was published on the bus.
    #[serde(rename_all = "camelCase")]
    TaskAck { request_id: RequestId },

    /// Bridge → every client: canonical telemetry.
    VehicleData { data: Telemetry },

    /// Bridge → issuing client: the vehicle reported arrival at the hop.
    #[serde(rename_all = "camelCase")]
    HopComplete { request_id: RequestId, node: String },

    /// Client → bridge: ask for the latest telemetry and journey counters.
    #[serde(rename_all = "camelCase")]
    GetStatus {
        #[serde(default)]
        request_id: Option<RequestId>,
    },

    /// Bridge → client: reply to `getStatus`.
    #[serde(rename_all = "camelCase")]
    Status {
        request_id: Option<RequestId>,
        telemetry:  Option<Telemetry>,
        stale:      bool,
        journey:    JourneySummary,
    },

    /// Client → bridge: the mission the hops belonged to is finished.
    #[serde(rename_all = "camelCase")]
    MissionComplete {
        #[serde(default)]
        task_id: Option<String>,
    },

    /// Either direction: a request could not be served.
    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(default)]
        request_id: Option<RequestId>,
        message:    String,
    },
}

impl SessionFrame {
    pub fn error(request_id: Option<RequestId>, message: impl Into<String>) -> Self {
        SessionFrame::Error { request_id, message: message.into() }
    }

    /// One JSON object followed by `\n`.
    pub fn encode_line(&self) -> Result<String, TransportError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one line; surrounding whitespace is ignored.
    pub fn decode_line(line: &str) -> Result<SessionFrame, TransportError> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// Counters a bridge accumulates over its vehicle's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneySummary {
    pub distance:      f64,
    pub carbon:        f64,
    pub cost:          f64,
    pub peak_velocity: f64,
    /// Arrivals per node name.
    pub node_visits:   BTreeMap<String, u64>,
    /// Traversals per `"From->To"` edge.
    pub edge_usage:    BTreeMap<String, u64>,
    pub missions_forwarded: u64,
    pub missions_completed: u64,
}
