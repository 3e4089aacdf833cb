//! `fleet-core`: foundational types for the `fleet_dt` vehicle allocation
//! framework.
//!
//! This crate is a dependency of every other `fleet-*` crate.  It has no
//! `fleet-*` dependencies and only a handful of external ones (`rand`, `rand_chacha`,
//! `thiserror`, `uuid`, `chrono`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `VehicleId`, `NodeIdx`, `EdgeIdx`, `TaskId`           |
//! | [`geo`]         | `Point2`, Euclidean distance                          |
//! | [`criterion`]   | `Criterion` optimisation objective                    |
//! | [`weights`]     | `EdgeRng`, hash-seeded carbon/cost factors            |
//! | [`config`]      | `FleetConfig` and per-actor config sections           |
//! | [`time`]        | Unix-millisecond timestamps                           |
//! | [`error`]       | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |
//!           | Required by `fleet-protocol` and config-file loading.      |

pub mod config;
pub mod criterion;
pub mod error;
pub mod geo;
pub mod ids;
pub mod time;
pub mod weights;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{AgentConfig, BridgeConfig, CoordinatorConfig, FleetConfig};
pub use criterion::Criterion;
pub use error::{CoreError, CoreResult};
pub use geo::Point2;
pub use ids::{EdgeIdx, NodeIdx, TaskId, VehicleId};
pub use time::{UnixMillis, now_millis};
pub use weights::{EdgeFactors, EdgeRng, DEFAULT_WEIGHT_SALT};
