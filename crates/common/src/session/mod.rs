//! Per-identity chat session: handshake state per peer, cached history,
//! and the seams to the message log and the relay

mod cache;
mod coordinator;
mod memory;
mod peer;
mod provider;

pub use cache::{CachePolicy, ChatCache, ChatRecord, RecordContent, RecordOrigin};
pub use coordinator::{ChatSession, SessionError};
pub use memory::MemoryMessageLog;
pub use peer::PeerStage;
pub use provider::{EnvelopeSink, MessageLog, PersistenceError, RelayError};
