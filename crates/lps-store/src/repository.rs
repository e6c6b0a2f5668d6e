use std::sync::Arc;

use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use lps_types::{ContinuationToken, DataChunk, PartitionKey};

use crate::batch::BatchWriter;
use crate::chunked::ChunkedReader;
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::predicate::Predicate;
use crate::retry::RetryPolicy;
use crate::traits::{BatchOperation, DocumentStore};

/// Typed, partition-scoped access to one collection.
///
/// Every method names its partition explicitly. A predicate is only ever
/// evaluated inside that partition, whatever fields it mentions.
pub struct PartitionedRepository<T> {
    store: Arc<dyn DocumentStore>,
    writer: BatchWriter,
    reader: ChunkedReader<T>,
}

impl<T: Document> PartitionedRepository<T> {
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self {
            writer: BatchWriter::new(store.clone(), policy),
            reader: ChunkedReader::new(store.clone()),
            store,
        }
    }

    /// Use `size` as the requested page size for chunked reads.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.reader = self.reader.with_page_size(size);
        self
    }

    pub fn collection(&self) -> &'static str {
        T::COLLECTION
    }

    pub fn reader(&self) -> &ChunkedReader<T> {
        &self.reader
    }

    /// Insert one item. `Conflict` if its id exists in its partition.
    pub async fn create(&self, item: &T) -> StoreResult<()> {
        self.store.create(T::COLLECTION, item.to_stored()?).await
    }

    /// Insert several items of one partition as a single atomic batch.
    ///
    /// Transient store failures are retried; see [`BatchWriter`].
    pub async fn create_many(&self, items: &[T], cancel: &CancellationToken) -> StoreResult<()> {
        let Some(first) = items.first() else {
            return Err(StoreError::InvalidArgument("no items to create".into()));
        };
        let partition = first.partition_key();
        let operations = items
            .iter()
            .map(|item| item.to_stored().map(BatchOperation::Create))
            .collect::<StoreResult<Vec<_>>>()?;
        self.writer
            .write(T::COLLECTION, &partition, operations, cancel)
            .await
    }

    /// Fetch one item, or `NotFound`.
    pub async fn get(&self, id: &str, partition: &PartitionKey) -> StoreResult<T> {
        self.find(id, partition)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: T::COLLECTION.to_string(),
                partition: partition.to_string(),
                id: id.to_string(),
            })
    }

    pub async fn find(&self, id: &str, partition: &PartitionKey) -> StoreResult<Option<T>> {
        match self.store.read(T::COLLECTION, partition, id).await? {
            Some(doc) => T::from_stored(&doc).map(Some),
            None => Ok(None),
        }
    }

    /// Replace an existing item. `NotFound` if absent.
    pub async fn update(&self, id: &str, item: &T) -> StoreResult<()> {
        if item.document_id() != id {
            return Err(StoreError::InvalidArgument(format!(
                "item id {} does not match {id}",
                item.document_id()
            )));
        }
        self.store.replace(T::COLLECTION, item.to_stored()?).await
    }

    /// Remove one item. Returns `true` if it existed.
    pub async fn delete(&self, id: &str, partition: &PartitionKey) -> StoreResult<bool> {
        self.store.delete(T::COLLECTION, partition, id).await
    }

    /// Every matching item in the partition, fully materialized.
    ///
    /// For collections of unknown size prefer [`Self::stream`].
    pub async fn scan(
        &self,
        predicate: &Predicate,
        partition: &PartitionKey,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<T>> {
        self.reader.collect_all(predicate, partition, cancel).await
    }

    pub async fn read_chunk(
        &self,
        predicate: &Predicate,
        partition: &PartitionKey,
        continuation: Option<&ContinuationToken>,
    ) -> StoreResult<DataChunk<T>> {
        self.reader.read_chunk(predicate, partition, continuation).await
    }

    pub fn stream(
        &self,
        predicate: Predicate,
        partition: PartitionKey,
        cancel: CancellationToken,
    ) -> BoxStream<'static, StoreResult<T>> {
        self.reader.stream(predicate, partition, None, cancel)
    }

    /// Delete every matching item in the partition. Zero matches is fine.
    ///
    /// Returns the number of items removed. Items that vanish between the
    /// scan and the delete are skipped.
    pub async fn delete_matching(
        &self,
        predicate: &Predicate,
        partition: &PartitionKey,
        cancel: &CancellationToken,
    ) -> StoreResult<usize> {
        let victims = self.scan(predicate, partition, cancel).await?;
        let mut removed = 0;
        for item in &victims {
            if cancel.is_cancelled() {
                return Err(StoreError::Cancelled);
            }
            if self.delete(&item.document_id(), partition).await? {
                removed += 1;
            }
        }
        debug!(
            collection = T::COLLECTION,
            partition = %partition,
            removed,
            "deleted matching documents"
        );
        Ok(removed)
    }
}
