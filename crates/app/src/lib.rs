//! sealchat client library: local state, key persistence and the remote
//! collaborators a [`common::session::ChatSession`] needs when it talks to a
//! running relay server.

pub mod chat;
pub mod keystore;
pub mod remote;
pub mod state;

pub use chat::{open_session, ChatError, DisplayRecord, RemoteSession};
pub use keystore::{FileKeyStore, FileKeyStoreError};
pub use remote::{HttpEnvelopeSink, RelaySocket, RelaySocketError, RemoteMessageLog};
pub use state::{AppConfig, AppState, StateError};
