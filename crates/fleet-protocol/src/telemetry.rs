//! Telemetry records.
//!
//! [`RawTelemetry`] is what a vehicle publishes on its `telemetry-update`
//! topic: loosely typed, every field optional, snake_case keys.
//! [`Telemetry`] is the canonical form the bridge forwards to its clients
//! once the current location has been derived.

use serde::{Deserialize, Serialize};

use fleet_core::{Point2, UnixMillis, VehicleId};

use crate::TransportError;

/// A node reference as vehicles report it: either a name or a bare index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNode {
    Index(u64),
    Name(String),
}

impl RawNode {
    /// Bare indices follow the `Node{n}` naming convention of map files.
    pub fn to_name(&self) -> String {
        match self {
            RawNode::Index(n) => format!("Node{n}"),
            RawNode::Name(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTelemetry {
    pub progress:          Option<f64>,
    pub next_location:     Option<String>,
    pub previous_location: Option<String>,
    pub current_node:      Option<RawNode>,
    pub x_coordinate:      Option<f64>,
    pub y_coordinate:      Option<f64>,
}

impl RawTelemetry {
    /// Parse a bus payload.  Rejects non-JSON input and progress values
    /// outside `0..=100`.
    pub fn decode(bytes: &[u8]) -> Result<RawTelemetry, TransportError> {
        let raw: RawTelemetry = serde_json::from_slice(bytes)?;
        if let Some(p) = raw.progress {
            if !p.is_finite() || !(0.0..=100.0).contains(&p) {
                return Err(TransportError::MalformedPayload(format!("progress {p} outside 0..=100")));
            }
        }
        Ok(raw)
    }

    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn position(&self) -> Option<Point2> {
        Some(Point2::new(self.x_coordinate?, self.y_coordinate?))
    }
}

/// Canonical telemetry forwarded to control-session clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    pub vehicle_id:        VehicleId,
    pub progress:          f64,
    /// `None` when no location field was usable.
    pub current_location:  Option<String>,
    pub next_location:     Option<String>,
    pub previous_location: Option<String>,
    pub position:          Option<Point2>,
    pub timestamp:         UnixMillis,
}

impl Telemetry {
    /// Progress 100 means the vehicle is standing on `current_location`.
    pub fn arrived(&self) -> bool {
        self.progress >= 100.0
    }

    pub fn location_or_unknown(&self) -> &str {
        self.current_location.as_deref().unwrap_or("unknown")
    }
}
