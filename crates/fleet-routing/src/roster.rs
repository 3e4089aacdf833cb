//! Fleet roster: the immutable list of vehicles and their static properties.

use std::collections::HashMap;

use fleet_core::VehicleId;

use crate::network::NetworkGraph;
use crate::{RoutingError, RoutingResult};

/// Static description of one vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSpec {
    pub id: VehicleId,
    /// Distance units per second.  Always finite and positive.
    pub speed: f64,
    /// Node the vehicle occupies at startup.
    pub start_node: String,
}

impl VehicleSpec {
    pub fn new(id: VehicleId, speed: f64, start_node: impl Into<String>) -> Self {
        Self { id, speed, start_node: start_node.into() }
    }
}

/// Validated roster, in declaration order.
#[derive(Debug, Clone)]
pub struct FleetRoster {
    vehicles: Vec<VehicleSpec>,
    by_id:    HashMap<VehicleId, usize>,
}

impl FleetRoster {
    /// Validate `vehicles` against `network`.
    ///
    /// Rejects duplicate ids, non-positive or non-finite speeds, and start
    /// nodes absent from the graph.
    pub fn new(vehicles: Vec<VehicleSpec>, network: &NetworkGraph) -> RoutingResult<Self> {
        let mut by_id = HashMap::with_capacity(vehicles.len());
        for (i, v) in vehicles.iter().enumerate() {
            if by_id.insert(v.id, i).is_some() {
                return Err(RoutingError::InvalidRoster(format!("duplicate vehicle id {}", v.id.0)));
            }
            if !(v.speed.is_finite() && v.speed > 0.0) {
                return Err(RoutingError::InvalidRoster(format!(
                    "vehicle {} has invalid speed {}",
                    v.id.0, v.speed
                )));
            }
            if !network.contains(&v.start_node) {
                return Err(RoutingError::UnknownNode(v.start_node.clone()));
            }
        }
        Ok(Self { vehicles, by_id })
    }

    pub fn get(&self, id: VehicleId) -> Option<&VehicleSpec> {
        self.by_id.get(&id).map(|&i| &self.vehicles[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &VehicleSpec> + '_ {
        self.vehicles.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.vehicles.iter().map(|v| v.id)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}
