use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use lps_types::{ContinuationToken, DataChunk, PartitionKey};

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::predicate::Predicate;
use crate::traits::DocumentStore;

/// Pages through every document of type `T` matching a predicate.
///
/// A chunk is one backend page, decoded. Callers resume by handing back the
/// chunk's token unchanged; the reader never inspects it. Walking tokens
/// until one comes back `None` visits each matching document exactly once,
/// provided the partition is not modified during the walk.
pub struct ChunkedReader<T> {
    store: Arc<dyn DocumentStore>,
    page_size: Option<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ChunkedReader<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            page_size: self.page_size,
            _marker: PhantomData,
        }
    }
}

impl<T: Document> ChunkedReader<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            page_size: None,
            _marker: PhantomData,
        }
    }

    /// Request at most `size` items per chunk. The backend cap still applies.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Fetch one chunk.
    ///
    /// An empty-string token is treated as absent.
    pub async fn read_chunk(
        &self,
        predicate: &Predicate,
        partition: &PartitionKey,
        continuation: Option<&ContinuationToken>,
    ) -> StoreResult<DataChunk<T>> {
        let continuation = continuation.filter(|t| !t.as_str().is_empty());
        let page = self
            .store
            .query_page(T::COLLECTION, partition, predicate, continuation, self.page_size)
            .await?;
        trace!(
            collection = T::COLLECTION,
            partition = %partition,
            items = page.documents.len(),
            more = page.continuation.is_some(),
            "chunk read"
        );
        let items = page
            .documents
            .iter()
            .map(T::from_stored)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(DataChunk::new(items, page.continuation))
    }

    /// Stream chunks until the token runs out.
    ///
    /// Cancellation is checked before each page request.
    pub fn chunks(
        &self,
        predicate: Predicate,
        partition: PartitionKey,
        start: Option<ContinuationToken>,
        cancel: CancellationToken,
    ) -> BoxStream<'static, StoreResult<DataChunk<T>>> {
        let reader = self.clone();
        // `None` = finished; `Some(token)` = fetch the page at `token`.
        stream::try_unfold(Some(start), move |state| {
            let reader = reader.clone();
            let predicate = predicate.clone();
            let partition = partition.clone();
            let cancel = cancel.clone();
            async move {
                let Some(token) = state else {
                    return Ok(None);
                };
                if cancel.is_cancelled() {
                    return Err(StoreError::Cancelled);
                }
                let chunk = reader
                    .read_chunk(&predicate, &partition, token.as_ref())
                    .await?;
                let next = chunk.continuation_token.clone().map(Some);
                Ok::<_, StoreError>(Some((chunk, next)))
            }
        })
        .boxed()
    }

    /// Stream individual items across all chunks.
    pub fn stream(
        &self,
        predicate: Predicate,
        partition: PartitionKey,
        start: Option<ContinuationToken>,
        cancel: CancellationToken,
    ) -> BoxStream<'static, StoreResult<T>> {
        self.chunks(predicate, partition, start, cancel)
            .map_ok(|chunk| stream::iter(chunk.items.into_iter().map(Ok)))
            .try_flatten()
            .boxed()
    }

    /// Materialize every matching item.
    pub async fn collect_all(
        &self,
        predicate: &Predicate,
        partition: &PartitionKey,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<T>> {
        self.stream(predicate.clone(), partition.clone(), None, cancel.clone())
            .try_collect()
            .await
    }
}
