use clap::Args;

use common::crypto::{KeyStore, KeyStoreError};
use common::envelope::UserId;
use sealchat::FileKeyStoreError;

#[derive(Args, Debug, Clone)]
pub struct Keygen {
    /// Identity to generate the key pair for
    #[arg(long = "as", value_name = "USER_ID")]
    pub identity: UserId,

    /// Replace an existing pair; secrets derived from the old one stop working
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct Pubkey {
    /// Identity whose public key to print
    #[arg(long = "as", value_name = "USER_ID")]
    pub identity: UserId,
}

#[derive(Debug, thiserror::Error)]
pub enum KeysError {
    #[error(transparent)]
    State(#[from] sealchat::StateError),
    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError<FileKeyStoreError>),
    #[error("no key pair for identity {0}, run 'sealchat keygen --as {0}' first")]
    NoKeyPair(UserId),
}

impl From<FileKeyStoreError> for KeysError {
    fn from(e: FileKeyStoreError) -> Self {
        KeysError::KeyStore(KeyStoreError::Store(e))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Keygen {
    type Error = KeysError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys = ctx.state()?.key_store();
        let pair = if self.force {
            keys.regenerate(self.identity)?
        } else {
            keys.load_or_generate(self.identity)?
        };

        Ok(format!(
            "Key pair for identity {} (fingerprint {}) at {}\n{}",
            self.identity,
            pair.public_key().fingerprint(),
            keys.path_for(self.identity).display(),
            pair.export_public()
        ))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Pubkey {
    type Error = KeysError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys = ctx.state()?.key_store();
        let pair = keys
            .load(self.identity)?
            .ok_or(KeysError::NoKeyPair(self.identity))?;
        Ok(pair.export_public())
    }
}
