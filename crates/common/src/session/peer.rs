use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::{PublicKey, SharedSecret};

/// Where a conversation with one peer stands in the handshake
///
/// `NoKeyExchange -> KeysExchanged -> SecretEstablished`; only the last
/// stage can send or open messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerStage {
    NoKeyExchange,
    KeysExchanged,
    SecretEstablished,
}

impl fmt::Display for PeerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PeerStage::NoKeyExchange => "no key exchange",
            PeerStage::KeysExchanged => "keys exchanged",
            PeerStage::SecretEstablished => "secret established",
        };
        f.write_str(s)
    }
}

/// Per-peer key material. A peer with no entry is in `NoKeyExchange`.
#[derive(Debug, Clone)]
pub(crate) enum PeerState {
    KeysExchanged {
        peer_public: PublicKey,
    },
    SecretEstablished {
        peer_public: PublicKey,
        secret: SharedSecret,
    },
}

impl PeerState {
    pub fn stage(&self) -> PeerStage {
        match self {
            PeerState::KeysExchanged { .. } => PeerStage::KeysExchanged,
            PeerState::SecretEstablished { .. } => PeerStage::SecretEstablished,
        }
    }

    pub fn peer_public(&self) -> &PublicKey {
        match self {
            PeerState::KeysExchanged { peer_public }
            | PeerState::SecretEstablished { peer_public, .. } => peer_public,
        }
    }

    pub fn secret(&self) -> Option<&SharedSecret> {
        match self {
            PeerState::SecretEstablished { secret, .. } => Some(secret),
            PeerState::KeysExchanged { .. } => None,
        }
    }

    /// Drop any derived secret, keeping the peer's public key
    pub fn revert(self) -> Self {
        match self {
            PeerState::SecretEstablished { peer_public, .. } => {
                PeerState::KeysExchanged { peer_public }
            }
            keys => keys,
        }
    }
}
