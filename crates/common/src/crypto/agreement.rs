//! ECDH key agreement over P-256
//!
//! Both sides of a conversation run [`derive`] with their own private key and
//! the other side's public key and arrive at the same 256-bit secret. The
//! secret is the raw x-coordinate of the shared point, exactly what WebCrypto
//! `deriveBits({ name: "ECDH" }, .., 256)` yields, so browser and native
//! clients interoperate.

use std::fmt;
use std::ops::Deref;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::keys::{KeyError, PrivateKey, PublicKey};

/// Size of a derived shared secret in bytes (256 bits)
pub const SHARED_SECRET_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum AgreementError {
    #[error("key agreement failed: {0}")]
    Default(String),
    #[error("key agreement failed: {0}")]
    Key(#[from] KeyError),
}

/// Symmetric key material shared by exactly two participants
///
/// Lives in memory only, one per peer per session. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHARED_SECRET_SIZE]);

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

impl Deref for SharedSecret {
    type Target = [u8; SHARED_SECRET_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; SHARED_SECRET_SIZE]> for SharedSecret {
    fn from(bytes: [u8; SHARED_SECRET_SIZE]) -> Self {
        SharedSecret(bytes)
    }
}

impl SharedSecret {
    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SHARED_SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, AgreementError> {
        if data.len() != SHARED_SECRET_SIZE {
            return Err(AgreementError::Default(format!(
                "invalid secret size, expected {}, got {}",
                SHARED_SECRET_SIZE,
                data.len()
            )));
        }
        let mut buff = [0; SHARED_SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/// Derive the secret shared between `private_key` and `peer_public_key`
///
/// Deterministic: the same two key pairs always produce the same secret,
/// whichever side runs the derivation.
pub fn derive(
    private_key: &PrivateKey,
    peer_public_key: &PublicKey,
) -> Result<SharedSecret, AgreementError> {
    let shared = p256::ecdh::diffie_hellman(
        private_key.inner().to_nonzero_scalar(),
        peer_public_key.inner().as_affine(),
    );
    let raw = shared.raw_secret_bytes();
    let secret = SharedSecret::from_slice(raw.as_slice())?;
    if secret.iter().all(|b| *b == 0) {
        return Err(AgreementError::Default("degenerate shared point".into()));
    }
    Ok(secret)
}

/// Derive against a peer key still in its serialized (JWK) exchange form
///
/// # Errors
///
/// Returns [`AgreementError::Key`] when the peer key is malformed or on a
/// curve other than P-256.
pub fn derive_from_jwk(
    private_key: &PrivateKey,
    peer_public_jwk: &str,
) -> Result<SharedSecret, AgreementError> {
    let peer_public_key = PublicKey::from_jwk(peer_public_jwk)?;
    derive(private_key, &peer_public_key)
}
