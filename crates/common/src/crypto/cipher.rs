//! Message encryption using AES-256-GCM
//!
//! Keyed directly by a [`SharedSecret`](super::SharedSecret). Every call to
//! [`encrypt`] draws a fresh 96-bit IV; the IV travels beside the ciphertext
//! in the envelope rather than being prefixed to it, which keeps the wire
//! format identical to the browser client's `{ encryptedMessage, iv }`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

/// Size of an AES-GCM IV in bytes
pub const IV_SIZE: usize = 12;
/// Size of the GCM authentication tag appended to every ciphertext
pub const TAG_SIZE: usize = 16;
/// Required key size in bytes (AES-256)
pub const KEY_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("decryption failed: {0}")]
    Decryption(String),
}

/// Output of a single encryption: ciphertext (tag appended) plus the IV used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; IV_SIZE],
}

fn cipher_for(key: &[u8]) -> Option<Aes256Gcm> {
    if key.len() != KEY_SIZE {
        return None;
    }
    Aes256Gcm::new_from_slice(key).ok()
}

/// Encrypt `plaintext` under `key` with a freshly generated IV
///
/// # Errors
///
/// Returns [`CipherError::Encryption`] if the key is not 32 bytes or the
/// system RNG cannot produce an IV.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Sealed, CipherError> {
    let cipher = cipher_for(key).ok_or_else(|| {
        CipherError::Encryption(format!(
            "invalid key size, expected {}, got {}",
            KEY_SIZE,
            key.len()
        ))
    })?;

    let mut iv = [0u8; IV_SIZE];
    getrandom::getrandom(&mut iv)
        .map_err(|e| CipherError::Encryption(format!("failed to generate iv: {}", e)))?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CipherError::Encryption("aead encrypt error".into()))?;

    Ok(Sealed { ciphertext, iv })
}

/// Decrypt and authenticate `ciphertext` produced by [`encrypt`]
///
/// # Errors
///
/// Returns [`CipherError::Decryption`] on a wrong key, a wrong or
/// wrong-length IV, or any modification of the ciphertext or tag.
/// Corrupted plaintext is never returned.
pub fn decrypt(key: &[u8], ciphertext: &[u8], iv: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = cipher_for(key).ok_or_else(|| {
        CipherError::Decryption(format!(
            "invalid key size, expected {}, got {}",
            KEY_SIZE,
            key.len()
        ))
    })?;
    if iv.len() != IV_SIZE {
        return Err(CipherError::Decryption(format!(
            "invalid iv size, expected {}, got {}",
            IV_SIZE,
            iv.len()
        )));
    }
    if ciphertext.len() < TAG_SIZE {
        return Err(CipherError::Decryption("ciphertext too short for tag".into()));
    }

    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CipherError::Decryption("authentication failed".into()))
}

/// Encrypt a UTF-8 chat message
pub fn encrypt_text(key: &[u8], text: &str) -> Result<Sealed, CipherError> {
    encrypt(key, text.as_bytes())
}

/// Decrypt a chat message, rejecting plaintext that is not valid UTF-8
pub fn decrypt_text(key: &[u8], ciphertext: &[u8], iv: &[u8]) -> Result<String, CipherError> {
    let plaintext = decrypt(key, ciphertext, iv)?;
    String::from_utf8(plaintext)
        .map_err(|_| CipherError::Decryption("plaintext is not valid utf-8".into()))
}
