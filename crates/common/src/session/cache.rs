//! Per-conversation message cache
//!
//! Each conversation, keyed by [`PairKey`], is an ordered list of records;
//! insertion order is display order. Every mutation happens under one short
//! lock, so concurrent sends and receives never lose an append.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::envelope::{EncryptedEnvelope, PairKey, UserId};

/// How many conversations the cache may hold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CachePolicy {
    /// Keep every conversation for the life of the session
    #[default]
    Unbounded,
    /// Evict the least recently touched conversation past `max_conversations`
    Lru { max_conversations: usize },
}

/// Where a cached record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    /// Composed here and echoed optimistically
    Local,
    /// Received live through the relay
    Relay,
    /// Fetched from the persisted log
    History,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RecordContent {
    /// Readable text
    Text { text: String },
    /// An envelope this session could not open
    Unreadable { envelope: EncryptedEnvelope },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub origin: RecordOrigin,
    pub content: RecordContent,
}

impl ChatRecord {
    pub fn text(
        sender_id: UserId,
        receiver_id: UserId,
        origin: RecordOrigin,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender_id,
            receiver_id,
            origin,
            content: RecordContent::Text { text: text.into() },
        }
    }

    pub fn unreadable(envelope: EncryptedEnvelope) -> Self {
        Self {
            sender_id: envelope.sender_id,
            receiver_id: envelope.receiver_id,
            origin: RecordOrigin::Relay,
            content: RecordContent::Unreadable { envelope },
        }
    }

    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.sender_id, self.receiver_id)
    }

    /// The readable text, if any
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            RecordContent::Text { text } => Some(text),
            RecordContent::Unreadable { .. } => None,
        }
    }

    pub fn is_readable(&self) -> bool {
        self.as_text().is_some()
    }
}

#[derive(Debug, Default)]
struct Conversation {
    records: Vec<ChatRecord>,
    /// Persisted history has been merged in
    loaded: bool,
    touched: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    conversations: HashMap<PairKey, Conversation>,
    clock: u64,
}

impl CacheInner {
    fn entry(&mut self, key: PairKey, policy: CachePolicy) -> &mut Conversation {
        self.clock += 1;
        let clock = self.clock;

        if !self.conversations.contains_key(&key) {
            if let CachePolicy::Lru { max_conversations } = policy {
                while self.conversations.len() >= max_conversations.max(1) {
                    let oldest = self
                        .conversations
                        .iter()
                        .min_by_key(|(_, c)| c.touched)
                        .map(|(k, _)| *k);
                    match oldest {
                        Some(oldest) => {
                            tracing::debug!(pair = %oldest, "evicting cached conversation");
                            self.conversations.remove(&oldest);
                        }
                        None => break,
                    }
                }
            }
        }

        let conversation = self.conversations.entry(key).or_default();
        conversation.touched = clock;
        conversation
    }
}

#[derive(Debug, Default)]
pub struct ChatCache {
    policy: CachePolicy,
    inner: Mutex<CacheInner>,
}

impl ChatCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Append a record to its conversation, returning the new length
    pub fn append(&self, record: ChatRecord) -> usize {
        let key = record.pair_key();
        let mut inner = self.inner.lock();
        let conversation = inner.entry(key, self.policy);
        conversation.records.push(record);
        conversation.records.len()
    }

    /// Snapshot of a conversation, `None` if it was never touched
    pub fn records(&self, key: PairKey) -> Option<Vec<ChatRecord>> {
        self.inner
            .lock()
            .conversations
            .get(&key)
            .map(|c| c.records.clone())
    }

    pub fn is_loaded(&self, key: PairKey) -> bool {
        self.inner
            .lock()
            .conversations
            .get(&key)
            .is_some_and(|c| c.loaded)
    }

    /// Merge fetched history in front of anything appended meanwhile
    ///
    /// Only the first merge for a conversation takes effect; later calls
    /// return the cached sequence unchanged.
    pub fn merge_history(&self, key: PairKey, history: Vec<ChatRecord>) -> Vec<ChatRecord> {
        let mut inner = self.inner.lock();
        let conversation = inner.entry(key, self.policy);
        if !conversation.loaded {
            let live = std::mem::take(&mut conversation.records);
            conversation.records = history;
            conversation.records.extend(live);
            conversation.loaded = true;
        }
        conversation.records.clone()
    }

    pub fn conversation_count(&self) -> usize {
        self.inner.lock().conversations.len()
    }

    pub fn clear(&self) {
        self.inner.lock().conversations.clear();
    }
}
