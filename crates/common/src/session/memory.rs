use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::provider::{MessageLog, PersistenceError};
use crate::envelope::{PairKey, StoredMessage, UserId};

/// In-memory message log
#[derive(Debug, Clone, Default)]
pub struct MemoryMessageLog {
    inner: Arc<RwLock<MemoryMessageLogInner>>,
}

#[derive(Debug, Default)]
struct MemoryMessageLogInner {
    /// Append order doubles as creation order
    records: Vec<StoredMessage>,
    next_id: i64,
}

impl MemoryMessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        message: impl Into<String>,
    ) -> StoredMessage {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let record = StoredMessage {
            id: inner.next_id,
            sender_id,
            receiver_id,
            message: message.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        inner.records.push(record.clone());
        record
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageLog for MemoryMessageLog {
    async fn history(&self, a: UserId, b: UserId) -> Result<Vec<StoredMessage>, PersistenceError> {
        let pair = PairKey::new(a, b);
        let inner = self.inner.read();
        Ok(inner
            .records
            .iter()
            .filter(|r| PairKey::new(r.sender_id, r.receiver_id) == pair)
            .cloned()
            .collect())
    }
}
