use std::path::PathBuf;

use clap::Args;

pub mod auth;
pub mod captcha;
pub mod health;
pub mod history;
pub mod init;
pub mod keys;
pub mod listen;
pub mod send;
pub mod users;
pub mod version;

pub use captcha::Captcha;
pub use health::Health;
pub use history::History;
pub use init::Init;
pub use keys::{Keygen, Pubkey};
pub use listen::Listen;
pub use send::Send;
pub use version::Version;

/// Where to read a peer's exported public key from
#[derive(Args, Debug, Clone, Default)]
pub struct PeerKeyArgs {
    /// Peer's exported public key (JWK JSON)
    #[arg(long, group = "peer_key_source")]
    pub peer_key: Option<String>,

    /// File holding the peer's exported public key
    #[arg(long, group = "peer_key_source")]
    pub peer_key_file: Option<PathBuf>,
}

impl PeerKeyArgs {
    pub fn resolve(&self) -> std::io::Result<Option<String>> {
        if let Some(key) = &self.peer_key {
            return Ok(Some(key.trim().to_string()));
        }
        match &self.peer_key_file {
            Some(path) => Ok(Some(std::fs::read_to_string(path)?.trim().to_string())),
            None => Ok(None),
        }
    }
}
