//! Bus topic naming: `vehicle/{id}/{channel}`.

use fleet_core::VehicleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Hop commands.  Payload is the bare destination node name.
    Command,
    /// Raw telemetry published by the vehicle.
    Telemetry,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Command, Channel::Telemetry];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Command => "command-instruction",
            Channel::Telemetry => "telemetry-update",
        }
    }
}

pub fn topic(vehicle: VehicleId, channel: Channel) -> String {
    format!("vehicle/{}/{}", vehicle.0, channel.as_str())
}

/// Inverse of [`topic`].
pub fn parse_topic(topic: &str) -> Option<(VehicleId, Channel)> {
    let mut parts = topic.split('/');
    if parts.next()? != "vehicle" {
        return None;
    }
    let id = parts.next()?.parse::<u32>().ok()?;
    let name = parts.next()?;
    let channel = Channel::ALL.into_iter().find(|c| c.as_str() == name)?;
    if parts.next().is_some() {
        return None;
    }
    Some((VehicleId(id), channel))
}

/// Encode a hop command payload.
pub fn command_payload(node: &str) -> Vec<u8> {
    node.as_bytes().to_vec()
}

/// Decode a hop command payload.  Surrounding whitespace and a pair of JSON
/// string quotes are tolerated.
pub fn parse_command(payload: &[u8]) -> Option<String> {
    let s = std::str::from_utf8(payload).ok()?.trim();
    let s = s.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(s);
    if s.is_empty() { None } else { Some(s.to_owned()) }
}
