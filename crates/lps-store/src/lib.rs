//! Partitioned document storage for the localization payload store.
//!
//! The [`DocumentStore`] trait is the backend boundary: partition-scoped
//! point operations, bounded predicate pages with opaque continuation
//! tokens, and atomic single-partition batches. On top of it:
//!
//! - [`PartitionedRepository`] gives typed create/get/update/scan/delete
//! - [`ChunkedReader`] turns paged scans into restartable chunk sequences
//! - [`BatchWriter`] retries transient batch failures per [`RetryPolicy`]
//!
//! [`InMemoryDocumentStore`] implements the backend for tests and embedding.

pub mod batch;
pub mod chunked;
pub mod document;
pub mod error;
pub mod memory;
pub mod predicate;
pub mod repository;
pub mod retry;
pub mod traits;

pub use batch::BatchWriter;
pub use chunked::ChunkedReader;
pub use document::{Document, StoredDocument, DATA_REFERENCES, METADATA, PAYLOADS};
pub use error::{StoreError, StoreResult, TransientKind};
pub use memory::{InMemoryConfig, InMemoryDocumentStore};
pub use predicate::Predicate;
pub use repository::PartitionedRepository;
pub use retry::RetryPolicy;
pub use traits::{BatchOperation, DocumentStore, Page};
