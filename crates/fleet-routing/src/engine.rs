//! Name-level path planning for vehicles.
//!
//! [`RoutingEngine::find_path`] is the one query the rest of the system
//! issues: it resolves names and the vehicle's speed, runs the [`Router`]
//! under the requested criterion, and converts the result back to names.

use std::sync::Arc;

use fleet_core::{Criterion, VehicleId};

use crate::network::NetworkGraph;
use crate::roster::FleetRoster;
use crate::router::{DijkstraRouter, EdgeWeight, Route, Router};
use crate::{RoutingError, RoutingResult};

// ── PathPlan ──────────────────────────────────────────────────────────────────

/// A priced path for one vehicle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathPlan {
    /// Node names from start to destination, inclusive.
    pub path: Vec<String>,
    pub distance: f64,
    pub carbon:   f64,
    pub cost:     f64,
    /// `distance / speed` for the vehicle that asked.
    pub travel_time: f64,
}

impl PathPlan {
    pub fn destination(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}

// ── RoutingEngine ─────────────────────────────────────────────────────────────

/// Graph + roster + router, shared read-only by every agent.
pub struct RoutingEngine<R: Router = DijkstraRouter> {
    network: Arc<NetworkGraph>,
    roster:  Arc<FleetRoster>,
    router:  R,
}

impl RoutingEngine<DijkstraRouter> {
    /// Engine using the default Dijkstra router.
    pub fn dijkstra(network: Arc<NetworkGraph>, roster: Arc<FleetRoster>) -> Self {
        Self::new(network, roster, DijkstraRouter)
    }
}

impl<R: Router> RoutingEngine<R> {
    pub fn new(network: Arc<NetworkGraph>, roster: Arc<FleetRoster>, router: R) -> Self {
        Self { network, roster, router }
    }

    pub fn network(&self) -> &NetworkGraph {
        &self.network
    }

    pub fn roster(&self) -> &FleetRoster {
        &self.roster
    }

    /// Plan a path for `vehicle` from `start` to `dest`.
    ///
    /// Errors are checked in order: unknown vehicle, unknown start, unknown
    /// destination, unreachable destination.
    ///
    /// Under [`Criterion::Time`] the distance-, carbon-, and cost-optimal
    /// paths are each timed at the vehicle's speed and the fastest kept.
    /// Ties go to the earlier of distance, carbon, cost.
    pub fn find_path(
        &self,
        vehicle: VehicleId,
        start: &str,
        dest: &str,
        criterion: Criterion,
    ) -> RoutingResult<PathPlan> {
        let spec = self.roster.get(vehicle).ok_or(RoutingError::UnknownVehicle(vehicle))?;
        let from = self.network.node(start).ok_or_else(|| RoutingError::UnknownNode(start.to_owned()))?;
        let to   = self.network.node(dest).ok_or_else(|| RoutingError::UnknownNode(dest.to_owned()))?;
        let speed = spec.speed;

        let route = match EdgeWeight::for_criterion(criterion) {
            Some(weight) => self.router.route(&self.network, from, to, weight)?,
            None => {
                let mut best: Option<Route> = None;
                for weight in Criterion::WEIGHTED.into_iter().filter_map(EdgeWeight::for_criterion) {
                    let candidate = self.router.route(&self.network, from, to, weight)?;
                    let faster = best
                        .as_ref()
                        .is_none_or(|b| candidate.distance / speed < b.distance / speed);
                    if faster {
                        best = Some(candidate);
                    }
                }
                // WEIGHTED is non-empty, so `best` is always set here.
                best.ok_or_else(|| RoutingError::NoPath { from: start.to_owned(), to: dest.to_owned() })?
            }
        };

        Ok(self.to_plan(route, speed))
    }

    fn to_plan(&self, route: Route, speed: f64) -> PathPlan {
        PathPlan {
            path:        route.nodes.iter().map(|&n| self.network.name(n).to_owned()).collect(),
            distance:    route.distance,
            carbon:      route.carbon,
            cost:        route.cost,
            travel_time: route.distance / speed,
        }
    }
}
