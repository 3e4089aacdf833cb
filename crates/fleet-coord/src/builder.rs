//! Fluent builder for constructing a [`Coordinator`].

use rand::SeedableRng;
use rand::rngs::SmallRng;

use fleet_core::CoordinatorConfig;
use fleet_protocol::{Directory, Mailbox};
use fleet_routing::{FleetRoster, NetworkGraph};

use crate::coordinator::{Coordinator, CoordinatorCore};
use crate::observer::{CoordinatorObserver, NoopObserver};
use crate::{CoordError, CoordResult};

/// Fluent builder for [`Coordinator<O>`].
///
/// # Required inputs
///
/// - [`CoordinatorConfig`]: round interval, response timeout, task limits, seed
/// - [`Directory`]: every vehicle registered in it receives CFPs
///
/// # Optional inputs (have defaults)
///
/// | Method                    | Default                                    |
/// |---------------------------|--------------------------------------------|
/// | `.destinations(v)`        | none; required unless `.network(..)` given |
/// | `.network(net, roster)`   | all nodes except the first vehicle's start |
/// | `.observer(o)`            | [`NoopObserver`]                           |
///
/// # Example
///
/// ```rust,ignore
/// let coordinator = CoordinatorBuilder::new(config.coordinator, directory)
///     .network(&network, &roster)
///     .observer(AllocationMetrics::new(roster.ids()))
///     .build(mailbox)?;
/// let core = coordinator.run(shutdown_rx).await;
/// ```
pub struct CoordinatorBuilder<O: CoordinatorObserver> {
    config:       CoordinatorConfig,
    directory:    Directory,
    destinations: Option<Vec<String>>,
    observer:     O,
}

impl CoordinatorBuilder<NoopObserver> {
    pub fn new(config: CoordinatorConfig, directory: Directory) -> Self {
        Self { config, directory, destinations: None, observer: NoopObserver }
    }
}

impl<O: CoordinatorObserver> CoordinatorBuilder<O> {
    /// Explicit candidate destinations.
    pub fn destinations(mut self, destinations: Vec<String>) -> Self {
        self.destinations = Some(destinations);
        self
    }

    /// Every node of `network` except the start node of the first roster
    /// vehicle.  An explicit `.destinations(..)` list takes precedence.
    pub fn network(mut self, network: &NetworkGraph, roster: &FleetRoster) -> Self {
        if self.destinations.is_none() {
            self.destinations = Some(default_destinations(network, roster));
        }
        self
    }

    pub fn observer<P: CoordinatorObserver>(self, observer: P) -> CoordinatorBuilder<P> {
        CoordinatorBuilder {
            config:       self.config,
            directory:    self.directory,
            destinations: self.destinations,
            observer,
        }
    }

    /// Validate and build the synchronous state machine.
    pub fn build_core(self) -> CoordResult<CoordinatorCore<O>> {
        let c = &self.config;
        if c.round_interval_ms == 0 {
            return Err(CoordError::Config("round_interval_ms must be > 0".into()));
        }
        if c.response_timeout_ms == 0 {
            return Err(CoordError::Config("response_timeout_ms must be > 0".into()));
        }
        if c.max_in_flight == Some(0) {
            return Err(CoordError::Config("max_in_flight must be > 0 when set".into()));
        }
        if self.directory.vehicles().is_empty() {
            return Err(CoordError::NoVehicles);
        }
        let destinations = self.destinations.unwrap_or_default();
        if destinations.is_empty() {
            return Err(CoordError::NoDestinations);
        }

        let rng = SmallRng::seed_from_u64(self.config.seed);
        Ok(CoordinatorCore::new(self.config, self.directory, destinations, rng, self.observer))
    }

    /// Validate and build the actor around `mailbox`, which must be the
    /// coordinator's mailbox from the same directory.
    pub fn build(self, mailbox: Mailbox) -> CoordResult<Coordinator<O>> {
        Ok(Coordinator::new(self.build_core()?, mailbox))
    }
}

/// All node names except the first roster vehicle's start node.
pub fn default_destinations(network: &NetworkGraph, roster: &FleetRoster) -> Vec<String> {
    let excluded = roster.iter().next().map(|v| v.start_node.as_str());
    network
        .names()
        .filter(|&n| Some(n) != excluded)
        .map(str::to_owned)
        .collect()
}
