//! Actor addressing.
//!
//! Every actor owns one [`Mailbox`].  The [`Directory`] maps each
//! [`Address`] to the sending half and is built once at startup, then cloned
//! into every actor that needs to talk to others.  No actor reaches another
//! except through it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use fleet_core::VehicleId;

use crate::{Message, ProtocolError};

/// Who a message is from or to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Address {
    Coordinator,
    Vehicle(VehicleId),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Coordinator => f.write_str("coordinator"),
            Address::Vehicle(id) => write!(f, "vehicle-{}", id.0),
        }
    }
}

/// A message in flight between two actors.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub from:    Address,
    pub to:      Address,
    pub message: Message,
}

/// Receiving half of an actor's inbox.
pub type Mailbox = mpsc::UnboundedReceiver<Envelope>;

// ── DirectoryBuilder ──────────────────────────────────────────────────────────

/// Registers every actor before any of them start.
#[derive(Default)]
pub struct DirectoryBuilder {
    senders: HashMap<Address, mpsc::UnboundedSender<Envelope>>,
}

impl DirectoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the mailbox for `addr`.  Registering an address twice replaces
    /// the earlier mailbox; its receiver will see no further messages.
    pub fn register(&mut self, addr: Address) -> Mailbox {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.insert(addr, tx);
        rx
    }

    pub fn build(self) -> Directory {
        Directory { senders: Arc::new(self.senders) }
    }
}

// ── Directory ─────────────────────────────────────────────────────────────────

/// Immutable address table, cheap to clone.
///
/// Inboxes are unbounded so `send` never waits: two actors sending to each
/// other at the same time cannot block one another.
#[derive(Clone)]
pub struct Directory {
    senders: Arc<HashMap<Address, mpsc::UnboundedSender<Envelope>>>,
}

impl Directory {
    /// Deliver `message` to `to`.  Fails with `UnknownRecipient` when the
    /// address was never registered or its actor has stopped.
    pub fn send(&self, from: Address, to: Address, message: impl Into<Message>) -> Result<(), ProtocolError> {
        let tx = self.senders.get(&to).ok_or(ProtocolError::UnknownRecipient(to))?;
        tx.send(Envelope { from, to, message: message.into() })
            .map_err(|_| ProtocolError::UnknownRecipient(to))
    }

    /// Every registered vehicle, in ascending id order.
    pub fn vehicles(&self) -> Vec<VehicleId> {
        let mut ids: Vec<VehicleId> = self
            .senders
            .keys()
            .filter_map(|a| match a {
                Address::Vehicle(id) => Some(*id),
                Address::Coordinator => None,
            })
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.senders.contains_key(&addr)
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut addrs: Vec<&Address> = self.senders.keys().collect();
        addrs.sort();
        f.debug_struct("Directory").field("addresses", &addrs).finish()
    }
}
