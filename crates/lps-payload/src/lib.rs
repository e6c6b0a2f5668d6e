//! Payload service for the localization payload store.
//!
//! [`PayloadService`] owns the payload lifecycle: create with inline or
//! overflow bodies, body reads (decoded or raw), body updates, and cascading
//! delete across the metadata and data-reference collections.
//!
//! Access to the child collections is split into four capability traits
//! ([`MetadataReader`], [`MetadataWriter`], [`DataReferenceReader`],
//! [`DataReferenceWriter`]). [`PayloadClientV1`] and [`PayloadClientV2`] are
//! two assemblies of them.

pub mod body;
pub mod client;
pub mod config;
pub mod error;
pub mod service;
pub mod traits;

pub use body::{BodyInput, NewPayload, PayloadBody, RawBody, JSON_CONTENT_TYPE};
pub use client::{PayloadClientV1, PayloadClientV2};
pub use config::PayloadConfig;
pub use error::{PayloadError, PayloadResult};
pub use service::{
    DataReferenceRepository, DeleteSummary, MetadataRepository, PayloadRepository, PayloadService,
};
pub use traits::{DataReferenceReader, DataReferenceWriter, MetadataReader, MetadataWriter};
