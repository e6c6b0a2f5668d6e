//! Per-exchange body signing.
//!
//! The sender signs the exact bytes it transmits, after any content
//! encoding, and carries the signature in the [`SIGNATURE`] header. The
//! receiver verifies against the raw bytes it received and only then
//! decodes. Nothing is ever re-serialized between signing and verifying.
//!
//! Signing is opt-in per call; an exchange that did not ask for it is never
//! checked, even when keys are configured.
//!
//! [`SIGNATURE`]: crate::endpoint::headers::SIGNATURE

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use lps_blob::{decode_bounded, encode, BlobError};
use lps_crypto::{Signature, SigningKey, VerifyingKey};
use lps_types::ContentEncoding;

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::MAX_BODY_SIZE;

/// Why a signed exchange failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("signature required but no signature present")]
    Missing,

    #[error("signature does not match the received body")]
    Mismatch,

    #[error("malformed signature header: {0}")]
    Malformed(String),
}

/// Sign `body` and return the header value.
pub fn sign_body(key: &SigningKey, body: &[u8]) -> String {
    key.sign(body).to_hex()
}

/// Check a signature header against the bytes actually received.
pub fn verify_body(
    key: &VerifyingKey,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), IntegrityError> {
    let raw = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(IntegrityError::Missing)?;
    let signature =
        Signature::from_hex(raw).map_err(|e| IntegrityError::Malformed(e.to_string()))?;
    key.verify(body, &signature)
        .map_err(|_| IntegrityError::Mismatch)
}

/// Parse a `Content-Encoding` header value.
///
/// Absent and `identity` both mean no encoding.
pub fn parse_encoding(header: Option<&str>) -> ProtocolResult<Option<ContentEncoding>> {
    match header.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("identity") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ProtocolError::UnsupportedEncoding(v.to_string())),
    }
}

/// A body ready to put on the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingBody {
    /// Exact bytes to transmit.
    pub bytes: Bytes,
    pub encoding: Option<ContentEncoding>,
    /// Header value, present only when the exchange is signed.
    pub signature: Option<String>,
}

impl OutgoingBody {
    /// Wrap bytes that are already in their wire form.
    pub fn wire(
        bytes: Bytes,
        encoding: Option<ContentEncoding>,
        signer: Option<&SigningKey>,
    ) -> Self {
        let signature = signer.map(|key| sign_body(key, &bytes));
        Self {
            bytes,
            encoding,
            signature,
        }
    }

    /// Encode `logical` bytes, then sign the encoded form.
    pub fn prepare(
        logical: Bytes,
        encoding: Option<ContentEncoding>,
        signer: Option<&SigningKey>,
    ) -> ProtocolResult<Self> {
        let bytes = match encoding {
            Some(enc) => encode(enc, &logical, 3)?,
            None => logical,
        };
        Ok(Self::wire(bytes, encoding, signer))
    }

    /// Serialize `value` as JSON and optionally sign it.
    pub fn json<T: Serialize>(value: &T, signer: Option<&SigningKey>) -> ProtocolResult<Self> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        Ok(Self::wire(Bytes::from(bytes), None, signer))
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// Receiver side of an exchange: verify the raw bytes, then decode them.
///
/// When `required` is false the signature header is ignored entirely.
/// Decoded bodies larger than [`MAX_BODY_SIZE`] are rejected.
pub fn open_body(
    bytes: Bytes,
    encoding: Option<ContentEncoding>,
    signature: Option<&str>,
    verifier: Option<&VerifyingKey>,
    required: bool,
) -> ProtocolResult<Bytes> {
    open_body_within(bytes, encoding, signature, verifier, required, MAX_BODY_SIZE)
}

/// [`open_body`] with an explicit cap on the decoded size.
pub fn open_body_within(
    bytes: Bytes,
    encoding: Option<ContentEncoding>,
    signature: Option<&str>,
    verifier: Option<&VerifyingKey>,
    required: bool,
    limit: usize,
) -> ProtocolResult<Bytes> {
    if required {
        let key = verifier.ok_or(ProtocolError::KeyNotConfigured("verifying"))?;
        verify_body(key, &bytes, signature)?;
        debug!(len = bytes.len(), "signed body verified");
    }
    match encoding {
        Some(encoding) => Ok(decode_bounded(encoding, &bytes, limit)?),
        None if bytes.len() > limit => Err(BlobError::TooLarge { limit }.into()),
        None => Ok(bytes),
    }
}
