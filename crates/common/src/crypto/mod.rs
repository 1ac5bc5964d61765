//! Cryptographic primitives for sealchat
//!
//! - **Key management**: P-256 key pairs, exported as JSON Web Keys for
//!   manual out-of-band exchange ([`KeyPair`], [`PublicKey`], [`PrivateKey`])
//! - **Key agreement**: ECDH between one private key and one peer public key
//!   producing a 256-bit [`SharedSecret`]
//! - **Message encryption**: AES-256-GCM keyed by the shared secret, with a
//!   fresh 96-bit IV per message
//! - **Key persistence**: the [`KeyStore`] seam the client uses to keep one
//!   pair per identity across restarts
//!
//! # Handshake
//!
//! 1. Each participant generates (once) and persists a [`KeyPair`]
//! 2. Participants swap [`KeyPair::export_public`] strings out of band
//! 3. Each side runs [`derive`] with its private key and the peer's public key
//! 4. Messages are sealed with [`encrypt`] and opened with [`decrypt`];
//!    the relay only ever sees ciphertext and IV

mod agreement;
pub mod cipher;
mod keys;
mod keystore;

pub use agreement::{derive, derive_from_jwk, AgreementError, SharedSecret, SHARED_SECRET_SIZE};
pub use cipher::{decrypt, decrypt_text, encrypt, encrypt_text, CipherError, Sealed, IV_SIZE, TAG_SIZE};
pub use keys::{KeyError, KeyPair, PrivateKey, PublicKey, CURVE_NAME};
pub use keystore::{KeyStore, KeyStoreError, MemoryKeyStore, MemoryKeyStoreError};
