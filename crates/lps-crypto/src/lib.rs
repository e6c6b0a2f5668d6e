//! Cryptographic primitives for the localization payload store.
//!
//! Provides Ed25519 signing/verification over exact byte sequences (with hex
//! encodings suitable for headers and config files) and domain-separated
//! BLAKE3 content digests.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod digest;
pub mod signer;

pub use digest::{ContentDigest, ContentHasher};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
