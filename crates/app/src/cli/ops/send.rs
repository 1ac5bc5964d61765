use clap::Args;

use common::envelope::UserId;
use sealchat::{open_session, ChatError};
use service::http::api::client::ApiError;
use service::http::api::v0::chat::{SendRequest, SendResponse};

use super::PeerKeyArgs;

#[derive(Args, Debug, Clone)]
pub struct Send {
    /// Identity to send as
    #[arg(long = "as", value_name = "USER_ID")]
    pub identity: UserId,

    /// Recipient identity
    #[arg(long)]
    pub to: UserId,

    #[command(flatten)]
    pub peer_key: PeerKeyArgs,

    /// Send through the unencrypted legacy chat endpoint, which stores the text
    #[arg(long)]
    pub plain: bool,

    /// Message text
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    State(#[from] sealchat::StateError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("failed to read peer key: {0}")]
    PeerKey(#[from] std::io::Error),
    #[error("encrypted send needs the recipient's public key (--peer-key or --peer-key-file)")]
    MissingPeerKey,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Send {
    type Error = SendError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        if self.plain {
            let stored: SendResponse = ctx
                .client
                .call(SendRequest {
                    sender_id: self.identity,
                    receiver_id: self.to,
                    message: self.text.clone(),
                })
                .await?;
            return Ok(format!(
                "Stored plaintext message {} at {}",
                stored.id, stored.created_at
            ));
        }

        let peer_key = self.peer_key.resolve()?.ok_or(SendError::MissingPeerKey)?;
        let keys = ctx.state()?.key_store();
        let session = open_session(&keys, &ctx.client, self.identity, Some((self.to, &peer_key)))?;

        let envelope = session
            .send_message(self.to, &self.text)
            .await
            .map_err(ChatError::from)?;

        Ok(format!(
            "Sent {} encrypted bytes to {}",
            envelope.encrypted_message.len(),
            self.to
        ))
    }
}
