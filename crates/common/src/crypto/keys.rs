use std::fmt;

use p256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};

/// Size of a P-256 private scalar in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of an uncompressed SEC1 P-256 public point in bytes
pub const PUBLIC_KEY_SIZE: usize = 65;
/// JWK curve name every imported key must carry
pub const CURVE_NAME: &str = "P-256";

const JWK_KEY_TYPE: &str = "EC";
// a random scalar is out of range with probability ~2^-32
const MAX_GENERATION_ATTEMPTS: usize = 8;

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key generation failed: {0}")]
    Generation(String),
    #[error("malformed key: {0}")]
    Malformed(String),
}

/// Public half of a participant's key agreement pair
///
/// Always a point on P-256. The canonical exchange form is a JSON Web Key
/// (`{"kty":"EC","crv":"P-256","x":..,"y":..}`) which is safe to paste
/// into a chat window or ship inside JSON.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(p256::PublicKey);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.fingerprint()).finish()
    }
}

impl From<p256::PublicKey> for PublicKey {
    fn from(key: p256::PublicKey) -> Self {
        PublicKey(key)
    }
}

impl PublicKey {
    /// Parse a public key from its JWK form
    ///
    /// Unknown JWK members (`ext`, `key_ops`, ...) are ignored so keys
    /// exported by browser WebCrypto import cleanly.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Malformed`] if the input is not a JWK, names a
    /// curve other than P-256, or the coordinates are not a point on the curve.
    pub fn from_jwk(serialized: &str) -> Result<Self, KeyError> {
        let jwk = JwkFields::parse(serialized)?;
        if jwk.d.is_some() {
            tracing::debug!("ignoring private component supplied with public key");
        }
        let key = p256::PublicKey::from_jwk_str(&jwk.public_json())
            .map_err(|_| KeyError::Malformed("public key is not a valid P-256 point".into()))?;
        Ok(PublicKey(key))
    }

    /// Serialize to the canonical JWK string used for out-of-band exchange
    pub fn to_jwk(&self) -> String {
        self.0.to_jwk_string()
    }

    /// Parse an uncompressed or compressed SEC1 encoded point
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        p256::PublicKey::from_sec1_bytes(bytes)
            .map(PublicKey)
            .map_err(|_| KeyError::Malformed("invalid SEC1 public key encoding".into()))
    }

    /// Uncompressed SEC1 encoding of the point
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Short hex fingerprint of the point, safe to log
    pub fn fingerprint(&self) -> String {
        let bytes = self.to_sec1_bytes();
        bytes[1..9].iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub(crate) fn inner(&self) -> &p256::PublicKey {
        &self.0
    }
}

/// Private half of a participant's key agreement pair
///
/// Extractable: the owning client persists it (as a JWK) in its
/// local key store so the identity survives restarts.
#[derive(Clone)]
pub struct PrivateKey(p256::SecretKey);

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bytes() == other.0.to_bytes()
    }
}

impl Eq for PrivateKey {}

impl PrivateKey {
    /// Generate a fresh private scalar from the OS RNG
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Generation`] if the system RNG is unavailable.
    pub fn generate() -> Result<Self, KeyError> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let mut bytes = [0u8; PRIVATE_KEY_SIZE];
            getrandom::getrandom(&mut bytes)
                .map_err(|e| KeyError::Generation(format!("system rng unavailable: {}", e)))?;
            // zero or >= n is rejected, draw again
            if let Ok(key) = p256::SecretKey::from_slice(&bytes) {
                return Ok(PrivateKey(key));
            }
        }
        Err(KeyError::Generation(
            "could not draw a valid scalar from the system rng".into(),
        ))
    }

    /// Parse a private key from its JWK form (must include `d`)
    pub fn from_jwk(serialized: &str) -> Result<Self, KeyError> {
        let jwk = JwkFields::parse(serialized)?;
        if jwk.d.is_none() {
            return Err(KeyError::Malformed("JWK has no private component".into()));
        }
        let key = p256::SecretKey::from_jwk_str(&jwk.private_json())
            .map_err(|_| KeyError::Malformed("private key is not a valid P-256 scalar".into()))?;

        // reject a `d` that does not belong to the advertised point
        let advertised = p256::PublicKey::from_jwk_str(&jwk.public_json())
            .map_err(|_| KeyError::Malformed("public key is not a valid P-256 point".into()))?;
        if key.public_key() != advertised {
            return Err(KeyError::Malformed(
                "private scalar does not match public point".into(),
            ));
        }
        Ok(PrivateKey(key))
    }

    /// Serialize to a JWK string including the private scalar
    pub fn to_jwk(&self) -> String {
        self.0.to_jwk_string().to_string()
    }

    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.public_key())
    }

    pub(crate) fn inner(&self) -> &p256::SecretKey {
        &self.0
    }
}

/// A participant's active key agreement pair
///
/// One pair per identity per device. Regenerating it invalidates every
/// secret previously derived from the old private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KeyPairRecord", into = "KeyPairRecord")]
pub struct KeyPair {
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new pair on P-256
    pub fn generate() -> Result<Self, KeyError> {
        let private_key = PrivateKey::generate()?;
        Ok(Self::from_private(private_key))
    }

    pub fn from_private(private_key: PrivateKey) -> Self {
        let public_key = private_key.public();
        Self {
            private_key,
            public_key,
        }
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Canonical serialized public key, for manual copy/paste exchange
    pub fn export_public(&self) -> String {
        self.public_key.to_jwk()
    }
}

/// Persisted form of a [`KeyPair`]
#[derive(Serialize, Deserialize)]
struct KeyPairRecord {
    private_key: String,
    public_key: String,
}

impl From<KeyPair> for KeyPairRecord {
    fn from(pair: KeyPair) -> Self {
        Self {
            private_key: pair.private_key.to_jwk(),
            public_key: pair.public_key.to_jwk(),
        }
    }
}

impl TryFrom<KeyPairRecord> for KeyPair {
    type Error = KeyError;

    fn try_from(record: KeyPairRecord) -> Result<Self, Self::Error> {
        let private_key = PrivateKey::from_jwk(&record.private_key)?;
        let public_key = PublicKey::from_jwk(&record.public_key)?;
        if private_key.public() != public_key {
            return Err(KeyError::Malformed(
                "stored public key does not match private key".into(),
            ));
        }
        Ok(Self {
            private_key,
            public_key,
        })
    }
}

/// The JWK members we care about; everything else is dropped
#[derive(Deserialize)]
struct JwkFields {
    kty: String,
    crv: String,
    x: String,
    y: String,
    #[serde(default)]
    d: Option<String>,
}

impl JwkFields {
    fn parse(serialized: &str) -> Result<Self, KeyError> {
        let jwk: JwkFields = serde_json::from_str(serialized.trim())
            .map_err(|e| KeyError::Malformed(format!("not a JSON web key: {}", e)))?;
        if jwk.kty != JWK_KEY_TYPE {
            return Err(KeyError::Malformed(format!(
                "unsupported key type {}, expected {}",
                jwk.kty, JWK_KEY_TYPE
            )));
        }
        if jwk.crv != CURVE_NAME {
            return Err(KeyError::Malformed(format!(
                "unsupported curve {}, expected {}",
                jwk.crv, CURVE_NAME
            )));
        }
        Ok(jwk)
    }

    fn public_json(&self) -> String {
        serde_json::json!({
            "kty": JWK_KEY_TYPE,
            "crv": CURVE_NAME,
            "x": self.x,
            "y": self.y,
        })
        .to_string()
    }

    fn private_json(&self) -> String {
        serde_json::json!({
            "kty": JWK_KEY_TYPE,
            "crv": CURVE_NAME,
            "x": self.x,
            "y": self.y,
            "d": self.d,
        })
        .to_string()
    }
}
