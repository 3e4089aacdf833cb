//! Correlation of requests with responses that arrive on another path.
//!
//! A request that will be answered asynchronously (by a bus callback, or by a
//! reply line on a session) registers a one-shot slot *before* it is sent.
//! The responder resolves the slot by id, or by label when the response does
//! not carry the id.  The requester awaits its [`PendingHandle`] with a hard
//! deadline.
//!
//! Every slot leaves the registry exactly once: when resolved, when its
//! handle is dropped (timed out or abandoned), or when swept after its
//! deadline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;

use fleet_protocol::TransportError;

/// One outstanding request.
#[derive(Debug)]
pub struct PendingRequest<T> {
    sender:         oneshot::Sender<T>,
    /// What the request is waiting for (e.g. the hop's destination node).
    pub label:      String,
    pub created_at: Instant,
    pub deadline:   Instant,
    generation:     u64,
}

#[derive(Debug)]
struct Slots<T> {
    by_id:           HashMap<String, PendingRequest<T>>,
    next_generation: u64,
}

/// Shared registry of one-shot completion slots, keyed by correlation id.
#[derive(Debug)]
pub struct PendingRegistry<T> {
    slots: Arc<Mutex<Slots<T>>>,
}

impl<T> Clone for PendingRegistry<T> {
    fn clone(&self) -> Self {
        Self { slots: self.slots.clone() }
    }
}

impl<T> Default for PendingRegistry<T> {
    fn default() -> Self {
        Self { slots: Arc::new(Mutex::new(Slots { by_id: HashMap::new(), next_generation: 0 })) }
    }
}

impl<T: Send + 'static> PendingRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot for `id` that expires after `timeout`.
    ///
    /// Registering an id that is already pending replaces the older slot;
    /// its waiter sees `Disconnected`.
    pub fn register(&self, id: impl Into<String>, label: impl Into<String>, timeout: Duration) -> PendingHandle<T> {
        let id = id.into();
        let (sender, receiver) = oneshot::channel();
        let now = Instant::now();
        let deadline = now + timeout;

        let mut slots = self.slots.lock();
        let generation = slots.next_generation;
        slots.next_generation += 1;
        let request = PendingRequest { sender, label: label.into(), created_at: now, deadline, generation };
        if slots.by_id.insert(id.clone(), request).is_some() {
            tracing::warn!(request = %id, "replaced an outstanding request with the same id");
        }
        drop(slots);

        PendingHandle { id, receiver, timeout, deadline, generation, slots: self.slots.clone() }
    }

    /// Resolve the slot for `id`.  Returns `false` if it was already
    /// resolved, timed out, or never existed.
    pub fn resolve(&self, id: &str, value: T) -> bool {
        let Some(request) = self.slots.lock().by_id.remove(id) else {
            return false;
        };
        request.sender.send(value).is_ok()
    }

    /// Resolve every slot whose label is `label`, each with a clone of
    /// `value`.  Returns how many waiters received it.
    pub fn resolve_label(&self, label: &str, value: T) -> usize
    where
        T: Clone,
    {
        let matched: Vec<PendingRequest<T>> = {
            let mut slots = self.slots.lock();
            let ids: Vec<String> = slots
                .by_id
                .iter()
                .filter(|(_, r)| r.label == label)
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| slots.by_id.remove(id)).collect()
        };
        matched.into_iter().filter_map(|r| r.sender.send(value.clone()).ok()).count()
    }

    /// Drop every slot whose deadline has passed.  Returns how many.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        let before = slots.by_id.len();
        slots.by_id.retain(|_, r| r.deadline > now);
        before - slots.by_id.len()
    }

    /// Drop every slot; their waiters see `Disconnected`.
    pub fn clear(&self) {
        self.slots.lock().by_id.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.lock().by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── PendingHandle ─────────────────────────────────────────────────────────────

/// Requester's side of a slot.  Dropping it removes the slot.
#[derive(Debug)]
pub struct PendingHandle<T> {
    id:         String,
    receiver:   oneshot::Receiver<T>,
    timeout:    Duration,
    deadline:   Instant,
    generation: u64,
    slots:      Arc<Mutex<Slots<T>>>,
}

impl<T> PendingHandle<T> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wait for the response until the deadline.
    ///
    /// `Timeout` once the deadline passes; `Disconnected` if the slot was
    /// dropped without a value.
    pub async fn wait(mut self) -> Result<T, TransportError> {
        match tokio::time::timeout_at(self.deadline, &mut self.receiver).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(TransportError::Disconnected),
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }
}

impl<T> Drop for PendingHandle<T> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        if slots.by_id.get(&self.id).is_some_and(|r| r.generation == self.generation) {
            slots.by_id.remove(&self.id);
        }
    }
}
