//! Overflow blob storage for the localization payload store.
//!
//! Payload bodies too large (or too binary) for inline document storage
//! live here, addressed by [`lps_types::AttachmentReference`].
//! [`OverflowStore`] adds encoding, deadlines and tolerant removal on top of
//! any [`BlobStore`] backend.

pub mod compression;
pub mod error;
pub mod memory;
pub mod overflow;
pub mod traits;

pub use compression::{decode, decode_bounded, decode_optional, encode, CompressionPolicy};
pub use error::{BlobError, BlobResult};
pub use memory::InMemoryBlobStore;
pub use overflow::{OverflowStore, DEFAULT_BLOB_TIMEOUT};
pub use traits::BlobStore;
