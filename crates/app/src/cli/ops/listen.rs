use clap::Args;

use common::envelope::UserId;
use sealchat::{open_session, ChatError, DisplayRecord, RelaySocket, RelaySocketError};

use super::PeerKeyArgs;

#[derive(Args, Debug, Clone)]
pub struct Listen {
    /// Identity to listen as
    #[arg(long = "as", value_name = "USER_ID")]
    pub identity: UserId,

    /// Peer whose messages should be decrypted
    #[arg(long, requires = "peer_key_source")]
    pub peer: Option<UserId>,

    #[command(flatten)]
    pub peer_key: PeerKeyArgs,

    /// Stop after this many messages
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    #[error(transparent)]
    State(#[from] sealchat::StateError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("relay error: {0}")]
    Relay(#[from] RelaySocketError),
    #[error("failed to read peer key: {0}")]
    PeerKey(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Listen {
    type Error = ListenError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let peer_key = self.peer_key.resolve()?;
        let keys = ctx.state()?.key_store();
        let peer = match (self.peer, peer_key.as_deref()) {
            (Some(peer), Some(key)) => Some((peer, key)),
            _ => None,
        };
        let session = open_session(&keys, &ctx.client, self.identity, peer)?;

        let mut socket = RelaySocket::connect(&ctx.client, Some(self.identity)).await?;
        let mut received = 0usize;

        loop {
            if self.count.is_some_and(|limit| received >= limit) {
                break;
            }
            let event = tokio::select! {
                event = socket.next_event() => event?,
                _ = tokio::signal::ctrl_c() => break,
            };
            let Some(event) = event else {
                break;
            };
            if let Some(record) = session.on_incoming(event.into_envelope()) {
                println!("{}", DisplayRecord(&record));
                received += 1;
            }
        }

        session.close();
        socket.close().await?;
        Ok(format!("Received {} messages", received))
    }
}
