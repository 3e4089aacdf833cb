//! Publish/subscribe transport.
//!
//! The bridge only needs two operations from a bus: publish bytes on a topic,
//! and register a callback for a topic.  Callbacks run on the bus's own
//! delivery task and must not block; the twin's callback only forwards into
//! a channel and resolves pending slots.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use fleet_protocol::TransportError;

/// Subscription callback: `(topic, payload)`.
pub type Handler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

pub trait Bus: Send + Sync {
    /// Queue `payload` for delivery to every subscriber of `topic`.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Register `handler` for exact-match `topic`.
    fn subscribe(&self, topic: &str, handler: Handler);
}

// ── InMemoryBus ───────────────────────────────────────────────────────────────

type Subscribers = Arc<RwLock<HashMap<String, Vec<Handler>>>>;

/// Process-local broker.
///
/// Messages are delivered in publish order from a single background task, so
/// a subscriber never runs on the publisher's stack.  Clones share the broker.
#[derive(Clone)]
pub struct InMemoryBus {
    queue:       mpsc::UnboundedSender<(String, Vec<u8>)>,
    subscribers: Subscribers,
}

impl InMemoryBus {
    /// Start the broker.  Must be called inside a tokio runtime.
    pub fn new() -> Self {
        let (queue, mut rx) = mpsc::unbounded_channel::<(String, Vec<u8>)>();
        let subscribers: Subscribers = Arc::default();

        let subs = subscribers.clone();
        tokio::spawn(async move {
            while let Some((topic, payload)) = rx.recv().await {
                // Snapshot so handlers may subscribe without deadlocking.
                let handlers = subs.read().get(&topic).cloned().unwrap_or_default();
                if handlers.is_empty() {
                    tracing::trace!(%topic, "no subscribers");
                }
                for handler in handlers {
                    handler(&topic, &payload);
                }
            }
            tracing::debug!("bus delivery task stopped");
        });

        Self { queue, subscribers }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers.read().get(topic).map_or(0, Vec::len)
    }
}

impl Bus for InMemoryBus {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.queue
            .send((topic.to_owned(), payload))
            .map_err(|_| TransportError::Disconnected)
    }

    fn subscribe(&self, topic: &str, handler: Handler) {
        self.subscribers.write().entry(topic.to_owned()).or_default().push(handler);
    }
}
