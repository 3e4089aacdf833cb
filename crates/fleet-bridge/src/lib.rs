//! `fleet-bridge`: the digital twin that sits between a vehicle's control
//! session and its publish/subscribe bus.
//!
//! One [`DigitalTwin`] runs per vehicle.  It accepts any number of
//! line-delimited control sessions over TCP, republishes hop commands on the
//! vehicle's command topic, and forwards canonicalised telemetry to every
//! connected client.  [`BridgeClient`] is the session's other end, used by
//! the vehicle agent.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                 |
//! |---------------|----------------------------------------------------------|
//! | [`bus`]       | `Bus` trait, `InMemoryBus` broker                        |
//! | [`pending`]   | `PendingRegistry` of one-shot completion slots           |
//! | [`telemetry`] | Location canonicalisation, `StalenessMonitor`            |
//! | [`journey`]   | `JourneyTracker` distance/carbon/cost counters           |
//! | [`twin`]      | `DigitalTwin` control-session server                     |
//! | [`client`]    | `BridgeClient`, `BridgeEvent`                            |
//! | [`error`]     | `BridgeError`, `BridgeResult<T>`                         |

pub mod bus;
pub mod client;
pub mod error;
pub mod journey;
pub mod pending;
pub mod telemetry;
pub mod twin;

#[cfg(test)]
mod tests;

pub use bus::{Bus, Handler, InMemoryBus};
pub use client::{BridgeClient, BridgeEvent};
pub use error::{BridgeError, BridgeResult};
pub use journey::JourneyTracker;
pub use pending::{PendingHandle, PendingRegistry};
pub use telemetry::{canonicalize, StalenessMonitor};
pub use twin::DigitalTwin;
