//! `fleet-protocol`: the message contract between coordinator, agents, and
//! bridges.
//!
//! Nothing in this crate makes a decision.  It defines what may be said
//! (closed, schema-checked message types), who may be addressed (the
//! [`Directory`] of actor mailboxes), and how bytes are framed on the two
//! external transports (the line-delimited control session and the bus).
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`messages`]  | `Message` and its record types (CFP, Proposal, …)         |
//! | [`envelope`]  | `Address`, `Envelope`, `Directory`, `DirectoryBuilder`    |
//! | [`session`]   | `SessionFrame`, `JourneySummary`, line codec              |
//! | [`telemetry`] | `RawTelemetry` (bus form), `Telemetry` (canonical form)   |
//! | [`topics`]    | `vehicle/{id}/{channel}` naming                           |
//! | [`error`]     | `ProtocolError`, `TransportError`                         |

pub mod envelope;
pub mod error;
pub mod messages;
pub mod session;
pub mod telemetry;
pub mod topics;


pub use envelope::{Address, Directory, DirectoryBuilder, Envelope, Mailbox};
pub use error::{ProtocolError, TransportError};
pub use messages::{
    Acceptance, Assignment, CallForProposal, Completion, Estimate, Message, NodeUpdate, Proposal,
    Rejection,
};
pub use session::{JourneySummary, RequestId, SessionFrame};
pub use telemetry::{RawNode, RawTelemetry, Telemetry};
pub use topics::Channel;
