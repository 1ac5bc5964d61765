use std::fmt::Debug;

use async_trait::async_trait;

use crate::envelope::{Envelope, StoredMessage, UserId};

/// The message log could not answer
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("message log unavailable: {0}")]
    Unavailable(String),
    #[error("unhandled message log error: {0}")]
    Provider(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("relay unavailable: {0}")]
    Unavailable(String),
    #[error("relay rejected envelope: {0}")]
    Rejected(String),
}

/// Read side of the persisted message log
///
/// The session only ever reads from the log on a cache miss; appends happen
/// server-side when a message is posted.
#[async_trait]
pub trait MessageLog: Send + Sync + Debug + 'static {
    /// Every record exchanged between `a` and `b`, in either direction,
    /// ordered by creation time ascending
    ///
    /// # Arguments
    /// * `a` - One participant of the conversation
    /// * `b` - The other participant; argument order must not matter
    async fn history(&self, a: UserId, b: UserId) -> Result<Vec<StoredMessage>, PersistenceError>;
}

/// Outbound side of the relay, as seen from a chat session
#[async_trait]
pub trait EnvelopeSink: Send + Sync + Debug + 'static {
    async fn publish(&self, envelope: Envelope) -> Result<(), RelayError>;
}
