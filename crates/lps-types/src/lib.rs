//! Foundation types for the localization payload store (LPS).
//!
//! This crate provides the identifiers, document shapes, and paging types
//! shared by every other LPS crate.
//!
//! # Key Types
//!
//! - [`PayloadId`] / [`ItemId`]: non-nil, string-encoded 128-bit identifiers
//! - [`PartitionKey`]: scopes a document to one consistently-readable partition
//! - [`Payload`]: root document with inline or overflow body storage
//! - [`AttachmentReference`]: pointer into the overflow blob store
//! - [`MetadataItem`] / [`DataReferenceItem`]: per-payload child collections
//! - [`DataChunk`] / [`ContinuationToken`]: one page of a chunked read
//! - [`ErrorKind`]: caller-facing failure taxonomy

pub mod chunk;
pub mod error;
pub mod ids;
pub mod items;
pub mod partition;
pub mod payload;

pub use chunk::{ContinuationToken, DataChunk};
pub use error::{ErrorKind, TypeError};
pub use ids::{ItemId, PayloadId};
pub use items::{
    DataReference, DataReferenceDescriptor, DataReferenceItem, MetadataDocument, MetadataItem,
    MetadataRecord,
};
pub use partition::PartitionKey;
pub use payload::{
    validate_category, AttachmentReference, BodyLocation, BodyStorage, ContentEncoding, Payload,
    DEFAULT_MAX_CATEGORY_LEN,
};
