/**
 * Cryptographic types and operations.
 *  - P-256 key pairs and their JWK exchange form
 *  - ECDH shared secret derivation
 *  - AES-256-GCM message sealing
 *  - Local key persistence seam
 */
pub mod crypto;
/**
 * Wire-level message units: encrypted and
 *  plaintext envelopes, conversation keys,
 *  persisted message records.
 */
pub mod envelope;
/**
 * Server-side fan-out of envelopes to
 *  connected listeners. Never holds keys.
 */
pub mod relay;
/**
 * Client-side chat session: per-peer
 *  handshake state, message cache, and the
 *  message log / relay seams it drives.
 */
pub mod session;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::crypto::{KeyPair, KeyStore, PublicKey, SharedSecret};
    pub use crate::envelope::{Envelope, EncryptedEnvelope, PairKey, PlainEnvelope, UserId};
    pub use crate::relay::{RelayChannel, RelayEvent, RelayPolicy};
    pub use crate::session::{ChatSession, EnvelopeSink, MessageLog, PeerStage, SessionError};
    pub use crate::version::build_info;
}
