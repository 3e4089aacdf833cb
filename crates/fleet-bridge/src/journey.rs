//! Per-vehicle journey counters reported in `status` replies.

use std::collections::BTreeMap;

use fleet_core::{time::secs_between, Point2, UnixMillis};
use fleet_protocol::{JourneySummary, Telemetry};

pub const CARBON_PER_UNIT: f64 = 0.12;
pub const COST_PER_UNIT:   f64 = 0.50;
pub const COST_PER_SECOND: f64 = 0.10;

#[derive(Debug, Clone, Default)]
pub struct JourneyTracker {
    distance:      f64,
    active_secs:   f64,
    peak_velocity: f64,
    node_visits:   BTreeMap<String, u64>,
    edge_usage:    BTreeMap<String, u64>,
    forwarded:     u64,
    completed:     u64,

    last_fix:     Option<(Point2, UnixMillis)>,
    last_arrival: Option<String>,
}

impl JourneyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one canonical telemetry record into the counters.
    ///
    /// Distance accrues between successive coordinate fixes; time counts as
    /// active only while the vehicle moved.  An arrival at a node other than
    /// the last one counts a visit and, when there was a previous arrival, an
    /// edge traversal.
    pub fn observe(&mut self, t: &Telemetry) {
        if let Some(pos) = t.position {
            if let Some((prev, prev_ts)) = self.last_fix {
                let d = prev.distance(pos);
                let dt = secs_between(prev_ts, t.timestamp);
                if d > 0.0 {
                    self.distance += d;
                    if dt > 0.0 {
                        self.active_secs += dt;
                        self.peak_velocity = self.peak_velocity.max(d / dt);
                    }
                }
            }
            self.last_fix = Some((pos, t.timestamp));
        }

        if t.arrived() {
            if let Some(node) = &t.current_location {
                if self.last_arrival.as_ref() != Some(node) {
                    *self.node_visits.entry(node.clone()).or_default() += 1;
                    if let Some(from) = &self.last_arrival {
                        *self.edge_usage.entry(format!("{from}->{node}")).or_default() += 1;
                    }
                    self.last_arrival = Some(node.clone());
                }
            }
        }
    }

    pub fn mission_forwarded(&mut self) {
        self.forwarded += 1;
    }

    pub fn mission_completed(&mut self) {
        self.completed += 1;
    }

    pub fn summary(&self) -> JourneySummary {
        JourneySummary {
            distance:           self.distance,
            carbon:             self.distance * CARBON_PER_UNIT,
            cost:               self.distance * COST_PER_UNIT + self.active_secs * COST_PER_SECOND,
            peak_velocity:      self.peak_velocity,
            node_visits:        self.node_visits.clone(),
            edge_usage:         self.edge_usage.clone(),
            missions_forwarded: self.forwarded,
            missions_completed: self.completed,
        }
    }
}
