//! `fleet-agent`: the vehicle side of the allocation protocol.
//!
//! A [`VehicleAgent`] prices calls for proposals with the shared
//! [`RoutingEngine`](fleet_routing::RoutingEngine), accepts at most one
//! assignment at a time, and drives its vehicle along the planned path one
//! hop at a time through a [`HopDispatcher`] (normally a
//! [`BridgeClient`](fleet_bridge::BridgeClient)).
//!
//! # Crate layout
//!
//! | Module    | Contents                                                      |
//! |-----------|---------------------------------------------------------------|
//! | [`state`] | `VehicleState`, `AgentPhase`, telemetry consistency rules     |
//! | [`hop`]   | `HopDispatcher` trait and its `BridgeClient` impl             |
//! | [`agent`] | `VehicleAgent` actor                                          |
//! | [`error`] | `AgentError`, `ConsistencyError`                              |

pub mod agent;
pub mod error;
pub mod hop;
pub mod state;


pub use agent::VehicleAgent;
pub use error::{AgentError, AgentResult, ConsistencyError};
pub use hop::HopDispatcher;
pub use state::{AgentPhase, TelemetryOutcome, VehicleState};
