//! Telemetry canonicalisation and staleness detection.

use std::time::Duration;

use tokio::time::Instant;

use fleet_core::{UnixMillis, VehicleId};
use fleet_protocol::{RawTelemetry, Telemetry};

/// Derive the canonical record from a raw bus payload.
///
/// Current location precedence:
/// 1. progress 100 with a next location: the vehicle is standing on it;
/// 2. the raw current node, if reported;
/// 3. the previous location;
/// 4. none.
pub fn canonicalize(raw: &RawTelemetry, vehicle: VehicleId, timestamp: UnixMillis) -> Telemetry {
    let progress = raw.progress.unwrap_or(0.0);
    let current_location = match (&raw.next_location, &raw.current_node) {
        (Some(next), _) if progress >= 100.0 => Some(next.clone()),
        (_, Some(node)) => Some(node.to_name()),
        _ => raw.previous_location.clone(),
    };
    Telemetry {
        vehicle_id: vehicle,
        progress,
        current_location,
        next_location: raw.next_location.clone(),
        previous_location: raw.previous_location.clone(),
        position: raw.position(),
        timestamp,
    }
}

// ── StalenessMonitor ──────────────────────────────────────────────────────────

/// Tracks the time since the last telemetry.
///
/// Staleness is an observability signal only.  [`check`](Self::check)
/// reports the transition into a stale episode once; the next
/// [`record`](Self::record) ends the episode.
#[derive(Debug, Clone)]
pub struct StalenessMonitor {
    threshold: Duration,
    last_seen: Instant,
    flagged:   bool,
}

impl StalenessMonitor {
    /// The clock starts at `now`, so a vehicle that never reports goes stale
    /// one threshold after startup.
    pub fn new(threshold: Duration, now: Instant) -> Self {
        Self { threshold, last_seen: now, flagged: false }
    }

    /// Note a telemetry arrival.  Returns `true` if this ends a stale episode.
    pub fn record(&mut self, now: Instant) -> bool {
        self.last_seen = now;
        std::mem::replace(&mut self.flagged, false)
    }

    /// Returns `true` exactly once per stale episode, when it begins.
    pub fn check(&mut self, now: Instant) -> bool {
        if self.flagged || !self.is_stale(now) {
            return false;
        }
        self.flagged = true;
        true
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) > self.threshold
    }

    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }
}
