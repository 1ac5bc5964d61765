use clap::Args;

use common::envelope::UserId;
use sealchat::{open_session, ChatError, DisplayRecord};

use super::PeerKeyArgs;

#[derive(Args, Debug, Clone)]
pub struct History {
    /// Identity to view the conversation as
    #[arg(long = "as", value_name = "USER_ID")]
    pub identity: UserId,

    /// The other participant
    #[arg(long)]
    pub with: UserId,

    #[command(flatten)]
    pub peer_key: PeerKeyArgs,
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error(transparent)]
    State(#[from] sealchat::StateError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("failed to read peer key: {0}")]
    PeerKey(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for History {
    type Error = HistoryError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let peer_key = self.peer_key.resolve()?;
        let keys = ctx.state()?.key_store();
        let session = open_session(
            &keys,
            &ctx.client,
            self.identity,
            peer_key.as_deref().map(|key| (self.with, key)),
        )?;

        let records = session
            .load_history(self.with)
            .await
            .map_err(ChatError::from)?;

        if records.is_empty() {
            return Ok("No messages".to_string());
        }
        Ok(records
            .iter()
            .map(|record| DisplayRecord(record).to_string())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
