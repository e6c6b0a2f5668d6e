//! Ed25519 keys and body signatures in their hex wire forms.
//!
//! Private keys live in config files and CLI arguments, public keys are
//! exchanged out of band, and signatures travel in a request or response
//! header. All three are lowercase hex; parsing tolerates surrounding
//! whitespace and mixed case.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::Signer;

use crate::digest::ContentHasher;

const KEY_FINGERPRINT: ContentHasher = ContentHasher::new("lps-key-v1");

/// Errors from parsing keys or checking signatures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature does not match")]
    InvalidSignature,
    #[error("not a valid ed25519 public key")]
    InvalidKey,
    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },
}

fn decode_hex<const N: usize>(what: &'static str, s: &str) -> Result<[u8; N], SignatureError> {
    let bytes = hex::decode(s.trim()).map_err(|e| SignatureError::Malformed {
        what,
        reason: e.to_string(),
    })?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| SignatureError::Malformed {
        what,
        reason: format!("expected {N} bytes, got {len}"),
    })
}

/// Private half of a signing pair. Never printed.
pub struct SigningKey(ed25519_dalek::SigningKey);

impl SigningKey {
    pub fn generate() -> Self {
        Self(ed25519_dalek::SigningKey::generate(&mut rand::thread_rng()))
    }

    /// Parse the 64-character hex secret written by `lps keygen`.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let secret = decode_hex::<32>("signing key", s)?;
        Ok(Self(ed25519_dalek::SigningKey::from_bytes(&secret)))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message))
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey(<redacted>, pub {})", self.verifying_key().fingerprint())
    }
}

/// Public half of a signing pair.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

impl VerifyingKey {
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = decode_hex::<32>("verifying key", s)?;
        ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| SignatureError::InvalidKey)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Strict verification: weak keys and malleable signatures are rejected.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        self.0
            .verify_strict(message, &signature.0)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Short stable identifier for logs: 16 hex chars of a BLAKE3 digest.
    pub fn fingerprint(&self) -> String {
        KEY_FINGERPRINT.digest(self.0.as_bytes()).to_hex()[..16].to_string()
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerifyingKey({})", self.fingerprint())
    }
}

/// Signature over an exact byte sequence, in its header form when displayed.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = decode_hex::<64>("signature", s)?;
        Ok(Self(ed25519_dalek::Signature::from_bytes(&bytes)))
    }
}

impl FromStr for Signature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", &self.to_hex()[..16])
    }
}
