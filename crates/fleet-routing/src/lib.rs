//! `fleet-routing`: map graph, fleet roster, and path planning.
//!
//! Routing is a pure query: nothing here performs I/O except the loaders,
//! and nothing holds mutable state after construction.  Agents share one
//! [`RoutingEngine`] behind an `Arc`.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`network`] | `NetworkGraph` (CSR + name index), `NetworkGraphBuilder`    |
//! | [`roster`]  | `VehicleSpec`, `FleetRoster`                                |
//! | [`router`]  | `Router` trait, `Route`, `EdgeWeight`, `DijkstraRouter`     |
//! | [`engine`]  | `RoutingEngine`, `PathPlan` (name-level `find_path`)        |
//! | [`loader`]  | Map and roster text loaders                                 |
//! | [`error`]   | `RoutingError`, `LoadError`, `RoutingResult<T>`             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on `PathPlan`.             |

pub mod engine;
pub mod error;
pub mod loader;
pub mod network;
pub mod roster;
pub mod router;

#[cfg(test)]
mod tests;

pub use engine::{PathPlan, RoutingEngine};
pub use error::{LoadError, RoutingError, RoutingResult};
pub use loader::{load_network, load_network_reader, load_roster, load_roster_reader};
pub use network::{NetworkGraph, NetworkGraphBuilder};
pub use roster::{FleetRoster, VehicleSpec};
pub use router::{DijkstraRouter, EdgeWeight, Route, Router};
