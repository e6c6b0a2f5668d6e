use async_trait::async_trait;

use lps_types::{ContinuationToken, PartitionKey};

use crate::document::StoredDocument;
use crate::error::StoreResult;
use crate::predicate::Predicate;

/// One bounded page of a predicate scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub documents: Vec<StoredDocument>,
    /// `None` once the scan is exhausted.
    pub continuation: Option<ContinuationToken>,
}

/// One member of an atomic batch.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchOperation {
    /// Insert; the batch fails if the id exists.
    Create(StoredDocument),
    /// Insert or overwrite.
    Upsert(StoredDocument),
    /// Overwrite; the batch fails if the id is absent.
    Replace(StoredDocument),
    /// Remove; the batch fails if the id is absent.
    Delete { id: String },
}

impl BatchOperation {
    /// Partition named by the operation's document, if it carries one.
    pub fn partition(&self) -> Option<&PartitionKey> {
        match self {
            Self::Create(doc) | Self::Upsert(doc) | Self::Replace(doc) => Some(&doc.partition),
            Self::Delete { .. } => None,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Create(doc) | Self::Upsert(doc) | Self::Replace(doc) => &doc.id,
            Self::Delete { id } => id,
        }
    }
}

/// Partitioned document collection backend.
///
/// This is the store-client boundary. Implementations must satisfy:
/// - Every operation is scoped to exactly one partition; there are no
///   cross-partition reads or writes.
/// - `query_page` never returns more than the backend's page cap, and the
///   continuation token it returns is opaque to every other component.
/// - `execute_batch` is all-or-nothing within its partition.
/// - Transient conditions are reported as `StoreError::Transient`; retrying
///   them is the caller's decision, never the backend's.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document. Fails with `Conflict` if the id exists in the partition.
    async fn create(&self, collection: &str, doc: StoredDocument) -> StoreResult<()>;

    /// Read a document. Returns `Ok(None)` if it does not exist.
    async fn read(
        &self,
        collection: &str,
        partition: &PartitionKey,
        id: &str,
    ) -> StoreResult<Option<StoredDocument>>;

    /// Replace an existing document. Fails with `NotFound` if absent.
    async fn replace(&self, collection: &str, doc: StoredDocument) -> StoreResult<()>;

    /// Delete a document. Returns `true` if it existed.
    async fn delete(&self, collection: &str, partition: &PartitionKey, id: &str)
        -> StoreResult<bool>;

    /// Fetch one page of documents matching `predicate` inside `partition`.
    ///
    /// `max_items` is a hint; the backend applies its own cap on top.
    async fn query_page(
        &self,
        collection: &str,
        partition: &PartitionKey,
        predicate: &Predicate,
        continuation: Option<&ContinuationToken>,
        max_items: Option<usize>,
    ) -> StoreResult<Page>;

    /// Apply every operation or none of them.
    async fn execute_batch(
        &self,
        collection: &str,
        partition: &PartitionKey,
        operations: Vec<BatchOperation>,
    ) -> StoreResult<()>;

    /// Largest number of operations accepted in one batch.
    fn max_batch_operations(&self) -> usize;
}
