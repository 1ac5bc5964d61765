//! Shared helpers for chat session integration tests
#![allow(dead_code)]

use std::sync::Arc;

use common::crypto::{KeyStore, MemoryKeyStore};
use common::envelope::UserId;
use common::relay::{RelayChannel, Subscription};
use common::session::{ChatSession, MemoryMessageLog};

pub type Session = ChatSession<MemoryMessageLog, RelayChannel>;

/// A participant wired to a shared relay and message log
pub struct Participant {
    pub session: Arc<Session>,
    pub inbox: Subscription,
}

impl Participant {
    pub fn id(&self) -> UserId {
        self.session.identity()
    }

    /// Feed everything queued on this participant's subscription into its
    /// session
    pub fn pump(&self) -> usize {
        let events = self.inbox.drain();
        let count = events.len();
        for event in events {
            self.session.on_incoming(event.into_envelope());
        }
        count
    }
}

pub fn join(
    id: UserId,
    keys: &MemoryKeyStore,
    log: &MemoryMessageLog,
    relay: &RelayChannel,
) -> Participant {
    let pair = keys.load_or_generate(id).unwrap();
    let session = Arc::new(ChatSession::new(id, pair, log.clone(), relay.clone()));
    let inbox = relay.subscribe(Some(id));
    Participant { session, inbox }
}

/// Swap public keys between two participants and derive secrets on both sides
pub fn handshake(a: &Participant, b: &Participant) {
    a.session
        .exchange_keys(b.id(), &b.session.export_public())
        .unwrap();
    b.session
        .exchange_keys(a.id(), &a.session.export_public())
        .unwrap();
}
