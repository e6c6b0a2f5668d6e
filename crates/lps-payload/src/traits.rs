use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use lps_types::{
    ContinuationToken, DataChunk, DataReference, DataReferenceItem, ItemId, MetadataItem,
    MetadataRecord, PartitionKey, PayloadId,
};

use crate::error::PayloadResult;

/// Read access to a payload's metadata collection.
///
/// Reads are scoped to the payload's own partition and never check that
/// the payload still exists; a deleted payload simply has no items.
#[async_trait]
pub trait MetadataReader: Send + Sync {
    /// One chunk of the payload's metadata items.
    async fn list_metadata(
        &self,
        payload_id: &PayloadId,
        continuation: Option<&ContinuationToken>,
        cancel: &CancellationToken,
    ) -> PayloadResult<DataChunk<MetadataItem>>;

    async fn get_metadata(
        &self,
        payload_id: &PayloadId,
        item_id: &ItemId,
        cancel: &CancellationToken,
    ) -> PayloadResult<MetadataItem>;
}

/// Write access to a payload's metadata collection.
///
/// Records name their own ids through [`MetadataRecord`].
#[async_trait]
pub trait MetadataWriter<M: MetadataRecord + 'static>: Send + Sync {
    /// Attach records to an existing payload as one atomic batch.
    async fn add_metadata(
        &self,
        payload_id: &PayloadId,
        partition: &PartitionKey,
        records: &[M],
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<MetadataItem>>;
}

/// Read access to a payload's data-reference collection.
#[async_trait]
pub trait DataReferenceReader: Send + Sync {
    async fn list_data_references(
        &self,
        payload_id: &PayloadId,
        continuation: Option<&ContinuationToken>,
        cancel: &CancellationToken,
    ) -> PayloadResult<DataChunk<DataReferenceItem>>;

    /// Every item whose provided id equals `provided_id`.
    async fn find_data_references(
        &self,
        payload_id: &PayloadId,
        provided_id: &str,
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<DataReferenceItem>>;
}

/// Write access to a payload's data-reference collection.
#[async_trait]
pub trait DataReferenceWriter<D: DataReference + 'static>: Send + Sync {
    /// Attach references to an existing payload as one atomic batch.
    async fn add_data_references(
        &self,
        payload_id: &PayloadId,
        partition: &PartitionKey,
        references: &[D],
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<DataReferenceItem>>;
}
