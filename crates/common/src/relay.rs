//! Real-time fan-out of envelopes to connected listeners
//!
//! The relay owns no key material and never inspects envelope contents
//! beyond the routing ids. Each listener gets its own bounded queue, so
//! `publish` is a non-blocking snapshot walk: a listener whose queue is full
//! loses that event and everyone else is unaffected.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::envelope::{Envelope, UserId};
use crate::session::{EnvelopeSink, RelayError};

/// Default per-listener queue depth
pub const DEFAULT_LISTENER_CAPACITY: usize = 256;

/// Who receives a published envelope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayPolicy {
    /// Every connected listener, regardless of the envelope's ids
    #[default]
    Broadcast,
    /// Only listeners registered as the envelope's sender or receiver
    Targeted,
}

impl FromStr for RelayPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "broadcast" => Ok(RelayPolicy::Broadcast),
            "targeted" => Ok(RelayPolicy::Targeted),
            other => Err(format!(
                "unknown relay policy '{}', expected broadcast or targeted",
                other
            )),
        }
    }
}

/// Events pushed to listeners
///
/// Serialized as `{"event": "receive_message", "data": <envelope>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RelayEvent {
    /// An envelope a client pushed through the relay
    ReceiveMessage(Envelope),
    /// A plaintext message persisted through the legacy chat endpoint
    NewMessage(Envelope),
}

impl RelayEvent {
    pub fn envelope(&self) -> &Envelope {
        match self {
            RelayEvent::ReceiveMessage(e) | RelayEvent::NewMessage(e) => e,
        }
    }

    pub fn into_envelope(self) -> Envelope {
        match self {
            RelayEvent::ReceiveMessage(e) | RelayEvent::NewMessage(e) => e,
        }
    }
}

/// Frames a connected client may send to the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    SendMessage(Envelope),
}

pub type ListenerId = u64;

#[derive(Debug)]
struct Listener {
    identity: Option<UserId>,
    tx: flume::Sender<RelayEvent>,
}

#[derive(Debug)]
struct RelayInner {
    policy: RelayPolicy,
    capacity: usize,
    next_id: AtomicU64,
    listeners: RwLock<HashMap<ListenerId, Listener>>,
}

impl RelayInner {
    fn remove(&self, id: ListenerId) -> bool {
        self.listeners.write().remove(&id).is_some()
    }
}

/// Outcome of a single publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    /// Listeners whose queue was full
    pub dropped: usize,
}

/// Handle to the relay hub. Cheap to clone; clones share listeners.
#[derive(Debug, Clone)]
pub struct RelayChannel {
    inner: Arc<RelayInner>,
}

impl Default for RelayChannel {
    fn default() -> Self {
        Self::new(RelayPolicy::default(), DEFAULT_LISTENER_CAPACITY)
    }
}

impl RelayChannel {
    pub fn new(policy: RelayPolicy, capacity: usize) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                policy,
                capacity: capacity.max(1),
                next_id: AtomicU64::new(1),
                listeners: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn policy(&self) -> RelayPolicy {
        self.inner.policy
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Register a listener
    ///
    /// `identity` is only consulted under [`RelayPolicy::Targeted`]; an
    /// anonymous listener receives nothing under that policy.
    pub fn subscribe(&self, identity: Option<UserId>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = flume::bounded(self.inner.capacity);
        self.inner
            .listeners
            .write()
            .insert(id, Listener { identity, tx });
        tracing::debug!(listener = id, ?identity, "relay listener subscribed");

        Subscription {
            id,
            rx,
            relay: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let removed = self.inner.remove(id);
        if removed {
            tracing::debug!(listener = id, "relay listener unsubscribed");
        }
        removed
    }

    /// Deliver `event` to the current snapshot of listeners without waiting
    pub fn publish(&self, event: RelayEvent) -> PublishReport {
        let envelope = event.envelope();
        let (sender_id, receiver_id) = (envelope.sender_id(), envelope.receiver_id());

        let targets: Vec<(ListenerId, flume::Sender<RelayEvent>)> = {
            let listeners = self.inner.listeners.read();
            listeners
                .iter()
                .filter(|(_, l)| match self.inner.policy {
                    RelayPolicy::Broadcast => true,
                    RelayPolicy::Targeted => {
                        matches!(l.identity, Some(id) if id == sender_id || id == receiver_id)
                    }
                })
                .map(|(id, l)| (*id, l.tx.clone()))
                .collect()
        };

        let mut report = PublishReport::default();
        let mut gone = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(event.clone()) {
                Ok(()) => report.delivered += 1,
                Err(flume::TrySendError::Full(_)) => {
                    tracing::warn!(listener = id, "relay listener queue full, dropping event");
                    report.dropped += 1;
                }
                Err(flume::TrySendError::Disconnected(_)) => gone.push(id),
            }
        }
        for id in gone {
            self.inner.remove(id);
        }

        tracing::debug!(
            sender_id,
            receiver_id,
            delivered = report.delivered,
            dropped = report.dropped,
            "relay publish"
        );
        report
    }
}

#[async_trait]
impl EnvelopeSink for RelayChannel {
    async fn publish(&self, envelope: Envelope) -> Result<(), RelayError> {
        RelayChannel::publish(self, RelayEvent::ReceiveMessage(envelope));
        Ok(())
    }
}

/// A registered listener's receiving end
///
/// Dropping it unsubscribes; that is the listener's terminal event and has
/// no effect on any other listener.
#[derive(Debug)]
pub struct Subscription {
    id: ListenerId,
    rx: flume::Receiver<RelayEvent>,
    relay: Weak<RelayInner>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Wait for the next event; `None` once the relay has gone away
    pub async fn recv(&self) -> Option<RelayEvent> {
        self.rx.recv_async().await.ok()
    }

    pub fn try_recv(&self) -> Option<RelayEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain everything queued right now
    pub fn drain(&self) -> Vec<RelayEvent> {
        self.rx.drain().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(relay) = self.relay.upgrade() {
            relay.remove(self.id);
        }
    }
}
