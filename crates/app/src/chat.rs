use std::fmt;

use common::crypto::{KeyStore, KeyStoreError};
use common::envelope::UserId;
use common::session::{ChatRecord, ChatSession, RecordContent, SessionError};
use service::http::api::client::ApiClient;

use crate::keystore::{FileKeyStore, FileKeyStoreError};
use crate::remote::{HttpEnvelopeSink, RemoteMessageLog};

pub type RemoteSession = ChatSession<RemoteMessageLog, HttpEnvelopeSink>;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError<FileKeyStoreError>),
    #[error("{0}")]
    Session(#[from] SessionError),
}

/// Open a session for `identity` against the relay behind `client`
///
/// The identity's key pair is restored from `keys`, or generated and
/// persisted on first use. When `peer` comes with its exported public key
/// the handshake is completed right away.
pub fn open_session(
    keys: &FileKeyStore,
    client: &ApiClient,
    identity: UserId,
    peer: Option<(UserId, &str)>,
) -> Result<RemoteSession, ChatError> {
    let key_pair = keys.load_or_generate(identity)?;
    let session = ChatSession::new(
        identity,
        key_pair,
        RemoteMessageLog::new(client.clone()),
        HttpEnvelopeSink::new(client.clone()),
    );
    if let Some((peer, public_key)) = peer {
        session.exchange_keys(peer, public_key)?;
    }
    Ok(session)
}

/// One line per record, as the CLI prints conversations
pub struct DisplayRecord<'a>(pub &'a ChatRecord);

impl fmt::Display for DisplayRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        match &record.content {
            RecordContent::Text { text } => {
                write!(f, "[{} -> {}] {}", record.sender_id, record.receiver_id, text)
            }
            RecordContent::Unreadable { envelope } => write!(
                f,
                "[{} -> {}] <unreadable: {} bytes>",
                record.sender_id,
                record.receiver_id,
                envelope.encrypted_message.len()
            ),
        }
    }
}
