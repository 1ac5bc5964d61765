use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use parking_lot::RwLock;

use super::keys::{KeyError, KeyPair};
use crate::envelope::UserId;

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError<T> {
    #[error("unhandled key store error: {0}")]
    Store(#[from] T),
    #[error("key error: {0}")]
    Key(KeyError),
}

/// Local durable storage for one [`KeyPair`] per identity
///
/// Implementations must make `save` all-or-nothing: a reader never observes
/// a partially written pair.
pub trait KeyStore: Send + Sync + Debug {
    type Error: Display + Debug;

    fn load(&self, identity: UserId) -> Result<Option<KeyPair>, Self::Error>;

    fn save(&self, identity: UserId, pair: &KeyPair) -> Result<(), Self::Error>;

    /// Restore the stored pair for `identity`, or generate and persist one
    ///
    /// Generation completes before anything is written, so a
    /// [`KeyError::Generation`] leaves the store untouched and the call can
    /// simply be retried.
    fn load_or_generate(&self, identity: UserId) -> Result<KeyPair, KeyStoreError<Self::Error>> {
        if let Some(pair) = self.load(identity)? {
            tracing::debug!(identity, "restored stored key pair");
            return Ok(pair);
        }
        self.regenerate(identity)
    }

    /// Replace the stored pair for `identity` with a freshly generated one
    fn regenerate(&self, identity: UserId) -> Result<KeyPair, KeyStoreError<Self::Error>> {
        let pair = KeyPair::generate().map_err(KeyStoreError::Key)?;
        self.save(identity, &pair)?;
        tracing::info!(
            identity,
            fingerprint = %pair.public_key().fingerprint(),
            "generated new key pair"
        );
        Ok(pair)
    }
}

/// In-memory key store, for tests and ephemeral sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyStore {
    inner: Arc<RwLock<HashMap<UserId, KeyPair>>>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryKeyStoreError {
    #[error("memory key store error: {0}")]
    Internal(String),
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    type Error = MemoryKeyStoreError;

    fn load(&self, identity: UserId) -> Result<Option<KeyPair>, Self::Error> {
        Ok(self.inner.read().get(&identity).cloned())
    }

    fn save(&self, identity: UserId, pair: &KeyPair) -> Result<(), Self::Error> {
        self.inner.write().insert(identity, pair.clone());
        Ok(())
    }
}
