//! Wire-level message units exchanged through the relay
//!
//! Two JSON shapes share the relay, told apart purely by field presence:
//!
//! ```text
//! encrypted: { "sender_id": 1, "receiver_id": 2, "encryptedMessage": [..], "iv": [..12] }
//! plaintext: { "sender_id": 1, "receiver_id": 2, "message": "hi" }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::{Sealed, IV_SIZE};

/// Opaque numeric participant id, owned by the server's user store
pub type UserId = i64;

/// A participant as the core sees it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
}

impl Identity {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

/// Order-independent key naming the conversation between two identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    low: UserId,
    high: UserId,
}

impl PairKey {
    pub fn new(a: UserId, b: UserId) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn members(&self) -> (UserId, UserId) {
        (self.low, self.high)
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.low == id || self.high == id
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.low, self.high)
    }
}

/// Ciphertext envelope: the relay never sees anything else of an encrypted chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    #[serde(rename = "encryptedMessage")]
    pub encrypted_message: Vec<u8>,
    /// Kept as a plain byte list so a wrong-length IV surfaces as a
    /// decryption failure instead of a parse failure.
    pub iv: Vec<u8>,
}

impl EncryptedEnvelope {
    pub fn seal(sender_id: UserId, receiver_id: UserId, sealed: Sealed) -> Self {
        Self {
            sender_id,
            receiver_id,
            encrypted_message: sealed.ciphertext,
            iv: sealed.iv.to_vec(),
        }
    }

    pub fn has_valid_iv(&self) -> bool {
        self.iv.len() == IV_SIZE
    }
}

/// Legacy unencrypted envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainEnvelope {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Encrypted(EncryptedEnvelope),
    Plain(PlainEnvelope),
}

impl Envelope {
    pub fn sender_id(&self) -> UserId {
        match self {
            Envelope::Encrypted(e) => e.sender_id,
            Envelope::Plain(p) => p.sender_id,
        }
    }

    pub fn receiver_id(&self) -> UserId {
        match self {
            Envelope::Encrypted(e) => e.receiver_id,
            Envelope::Plain(p) => p.receiver_id,
        }
    }

    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.sender_id(), self.receiver_id())
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Envelope::Encrypted(_))
    }
}

impl From<EncryptedEnvelope> for Envelope {
    fn from(envelope: EncryptedEnvelope) -> Self {
        Envelope::Encrypted(envelope)
    }
}

impl From<PlainEnvelope> for Envelope {
    fn from(envelope: PlainEnvelope) -> Self {
        Envelope::Plain(envelope)
    }
}

/// A persisted message log record, as returned by history queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}
