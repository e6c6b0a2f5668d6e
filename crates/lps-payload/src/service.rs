use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lps_blob::{BlobStore, OverflowStore};
use lps_store::{Document, DocumentStore, PartitionedRepository, Predicate, StoreError};
use lps_types::{
    validate_category, BodyLocation, BodyStorage, ContinuationToken, DataChunk, DataReference,
    DataReferenceItem, ItemId, MetadataItem, MetadataRecord, PartitionKey, Payload, PayloadId,
};

use crate::body::{BodyInput, NewPayload, PayloadBody, RawBody, JSON_CONTENT_TYPE};
use crate::config::PayloadConfig;
use crate::error::{PayloadError, PayloadResult};
use crate::traits::{DataReferenceReader, DataReferenceWriter, MetadataReader, MetadataWriter};

pub type PayloadRepository = PartitionedRepository<Payload>;
pub type MetadataRepository = PartitionedRepository<MetadataItem>;
pub type DataReferenceRepository = PartitionedRepository<DataReferenceItem>;

/// What a payload delete removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub metadata_removed: usize,
    pub data_references_removed: usize,
    /// Whether an overflow blob existed and was removed.
    pub blob_removed: bool,
}

/// Payload lifecycle over a document store and an overflow blob store.
///
/// Overflow writes upload the blob before the document that points at it,
/// so a failure in between leaves an orphaned blob, never a dangling
/// reference. Deletes run in the reverse order: children, then the blob,
/// then the document.
pub struct PayloadService {
    payloads: PayloadRepository,
    metadata: MetadataRepository,
    references: DataReferenceRepository,
    overflow: OverflowStore,
    config: PayloadConfig,
}

fn repository<T: Document>(
    store: &Arc<dyn DocumentStore>,
    config: &PayloadConfig,
) -> PartitionedRepository<T> {
    let repo = PartitionedRepository::new(store.clone(), config.retry.clone());
    match config.page_size {
        Some(size) => repo.with_page_size(size),
        None => repo,
    }
}

fn check_cancel(cancel: &CancellationToken) -> PayloadResult<()> {
    if cancel.is_cancelled() {
        return Err(PayloadError::Cancelled);
    }
    Ok(())
}

impl PayloadService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        config: PayloadConfig,
    ) -> PayloadResult<Self> {
        config.validate()?;
        Ok(Self {
            payloads: repository(&store, &config),
            metadata: repository(&store, &config),
            references: repository(&store, &config),
            overflow: OverflowStore::new(blobs, config.compression.clone())
                .with_timeout(config.blob_timeout()),
            config,
        })
    }

    pub fn config(&self) -> &PayloadConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Payloads
    // -----------------------------------------------------------------------

    /// Create a payload. `Conflict` if the id is already taken in its partition.
    pub async fn create(
        &self,
        new: NewPayload,
        cancel: &CancellationToken,
    ) -> PayloadResult<Payload> {
        validate_category(&new.category, self.config.max_category_len)?;
        let id = match new.id {
            Some(id) if self.owns_children(&id).await? => {
                return Err(PayloadError::AlreadyExists(id));
            }
            Some(id) => id,
            None => PayloadId::new(),
        };
        if self
            .payloads
            .find(&id.to_string(), &new.partition_key)
            .await?
            .is_some()
        {
            return Err(PayloadError::AlreadyExists(id));
        }
        check_cancel(cancel)?;

        let location = self.place_body(&id, new.body).await?;
        let mut payload = Payload::new(id, new.partition_key, new.category);
        payload.set_body(location);
        payload.validate(self.config.max_category_len)?;

        if let Err(e) = self.payloads.create(&payload).await {
            if let Some(attachment) = &payload.attachment {
                warn!(
                    payload = %id,
                    attachment = %attachment.attachment_id,
                    error = %e,
                    "payload write failed after blob upload, blob orphaned"
                );
            }
            return Err(match e {
                StoreError::Conflict { .. } => PayloadError::AlreadyExists(id),
                other => other.into(),
            });
        }
        info!(
            payload = %id,
            partition = %payload.partition_key,
            storage = %payload.storage,
            "payload created"
        );
        Ok(payload)
    }

    pub async fn get(
        &self,
        id: &PayloadId,
        partition: &PartitionKey,
        cancel: &CancellationToken,
    ) -> PayloadResult<Payload> {
        check_cancel(cancel)?;
        self.payloads
            .find(&id.to_string(), partition)
            .await?
            .ok_or_else(|| PayloadError::NotFound {
                id: *id,
                partition: partition.to_string(),
            })
    }

    /// Resolve the body to its logical form, downloading overflow content.
    pub async fn read_body(
        &self,
        id: &PayloadId,
        partition: &PartitionKey,
        cancel: &CancellationToken,
    ) -> PayloadResult<PayloadBody> {
        let payload = self.get(id, partition, cancel).await?;
        let location = payload.body()?;
        if matches!(location, BodyLocation::Blob(_) | BodyLocation::BinaryBlob(_)) {
            check_cancel(cancel)?;
        }
        match location {
            BodyLocation::Inline(None) => Ok(PayloadBody::Empty),
            BodyLocation::Inline(Some(value)) => Ok(PayloadBody::Json(value)),
            BodyLocation::Blob(attachment) => {
                let bytes = self.overflow.get(&attachment).await?;
                serde_json::from_slice(&bytes)
                    .map(PayloadBody::Json)
                    .map_err(|e| PayloadError::CorruptBody {
                        id: *id,
                        reason: e.to_string(),
                    })
            }
            BodyLocation::BinaryBlob(attachment) => {
                let bytes = self.overflow.get(&attachment).await?;
                Ok(PayloadBody::Binary {
                    content_type: attachment.content_type,
                    bytes,
                })
            }
        }
    }

    /// The body exactly as stored, without decoding overflow content.
    pub async fn read_body_raw(
        &self,
        id: &PayloadId,
        partition: &PartitionKey,
        cancel: &CancellationToken,
    ) -> PayloadResult<RawBody> {
        let payload = self.get(id, partition, cancel).await?;
        match payload.body()? {
            BodyLocation::Inline(data) => {
                let bytes = match data {
                    Some(value) => Bytes::from(
                        serde_json::to_vec(&value)
                            .map_err(|e| StoreError::Serialization(e.to_string()))?,
                    ),
                    None => Bytes::new(),
                };
                Ok(RawBody {
                    storage: BodyStorage::Inline,
                    content_type: JSON_CONTENT_TYPE.to_string(),
                    encoding: None,
                    bytes,
                })
            }
            BodyLocation::Blob(attachment) | BodyLocation::BinaryBlob(attachment) => {
                check_cancel(cancel)?;
                let bytes = self.overflow.get_raw(&attachment).await?;
                Ok(RawBody {
                    storage: payload.storage,
                    content_type: attachment.content_type,
                    encoding: attachment.content_encoding,
                    bytes,
                })
            }
        }
    }

    /// Replace the body. A previous overflow attachment is abandoned, not
    /// deleted or rewritten.
    pub async fn update_body(
        &self,
        id: &PayloadId,
        partition: &PartitionKey,
        body: BodyInput,
        cancel: &CancellationToken,
    ) -> PayloadResult<Payload> {
        let mut payload = self.get(id, partition, cancel).await?;
        check_cancel(cancel)?;
        let previous = payload.attachment.clone();

        let location = self.place_body(id, body).await?;
        payload.set_body(location);
        payload.validate(self.config.max_category_len)?;
        if let Err(e) = self.payloads.update(&id.to_string(), &payload).await {
            if let Some(attachment) = &payload.attachment {
                warn!(
                    payload = %id,
                    attachment = %attachment.attachment_id,
                    error = %e,
                    "payload write failed after blob upload, blob orphaned"
                );
            }
            return Err(e.into());
        }

        if let Some(old) = previous {
            debug!(payload = %id, attachment = %old.attachment_id, "previous attachment abandoned");
        }
        debug!(payload = %id, storage = %payload.storage, "payload body updated");
        Ok(payload)
    }

    /// Delete a payload with its metadata, data references and overflow blob.
    ///
    /// A blob that is already gone, or cannot be removed, does not fail the
    /// delete; the failure is logged.
    pub async fn delete(
        &self,
        id: &PayloadId,
        partition: &PartitionKey,
        cancel: &CancellationToken,
    ) -> PayloadResult<DeleteSummary> {
        let payload = self.get(id, partition, cancel).await?;
        let children = PartitionKey::from(*id);

        let metadata_removed = self
            .metadata
            .delete_matching(&Predicate::All, &children, cancel)
            .await?;
        debug!(payload = %id, removed = metadata_removed, "metadata removed");

        let data_references_removed = self
            .references
            .delete_matching(&Predicate::All, &children, cancel)
            .await?;
        debug!(payload = %id, removed = data_references_removed, "data references removed");

        check_cancel(cancel)?;
        let blob_removed = match &payload.attachment {
            Some(attachment) => match self.overflow.remove(attachment).await {
                Ok(removed) => removed,
                Err(e) => {
                    warn!(
                        payload = %id,
                        attachment = %attachment.attachment_id,
                        error = %e,
                        "overflow blob removal failed, continuing delete"
                    );
                    false
                }
            },
            None => false,
        };

        self.payloads.delete(&id.to_string(), partition).await?;
        info!(
            payload = %id,
            partition = %partition,
            metadata_removed,
            data_references_removed,
            blob_removed,
            "payload deleted"
        );
        Ok(DeleteSummary {
            metadata_removed,
            data_references_removed,
            blob_removed,
        })
    }

    /// Whether metadata or data references are already filed under `id`.
    async fn owns_children(&self, id: &PayloadId) -> PayloadResult<bool> {
        let children = PartitionKey::from(*id);
        let metadata = self
            .metadata
            .read_chunk(&Predicate::All, &children, None)
            .await?;
        if !metadata.items.is_empty() || metadata.has_more() {
            return Ok(true);
        }
        let references = self
            .references
            .read_chunk(&Predicate::All, &children, None)
            .await?;
        Ok(!references.items.is_empty() || references.has_more())
    }

    async fn place_body(&self, id: &PayloadId, body: BodyInput) -> PayloadResult<BodyLocation> {
        match body {
            BodyInput::Empty | BodyInput::Json(Value::Null) => Ok(BodyLocation::Inline(None)),
            BodyInput::Json(value) => {
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| PayloadError::InvalidArgument(e.to_string()))?;
                if bytes.len() <= self.config.max_inline_bytes {
                    return Ok(BodyLocation::Inline(Some(value)));
                }
                let attachment = self
                    .overflow
                    .put(id, JSON_CONTENT_TYPE, Bytes::from(bytes))
                    .await?;
                Ok(BodyLocation::Blob(attachment))
            }
            BodyInput::Binary {
                content_type,
                bytes,
            } => {
                if content_type.trim().is_empty() {
                    return Err(PayloadError::InvalidArgument(
                        "binary body needs a content type".into(),
                    ));
                }
                let attachment = self.overflow.put(id, &content_type, bytes).await?;
                Ok(BodyLocation::BinaryBlob(attachment))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Child collections
    // -----------------------------------------------------------------------

    pub async fn add_metadata<M: MetadataRecord>(
        &self,
        payload_id: &PayloadId,
        partition: &PartitionKey,
        records: &[M],
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<MetadataItem>> {
        if records.is_empty() {
            return Err(PayloadError::InvalidArgument("no metadata records".into()));
        }
        let items = records
            .iter()
            .map(|r| MetadataItem::from_record(*payload_id, r))
            .collect::<Result<Vec<_>, _>>()?;
        self.get(payload_id, partition, cancel).await?;
        self.metadata.create_many(&items, cancel).await?;
        debug!(payload = %payload_id, count = items.len(), "metadata added");
        Ok(items)
    }

    pub async fn list_metadata(
        &self,
        payload_id: &PayloadId,
        continuation: Option<&ContinuationToken>,
        cancel: &CancellationToken,
    ) -> PayloadResult<DataChunk<MetadataItem>> {
        check_cancel(cancel)?;
        Ok(self
            .metadata
            .read_chunk(&Predicate::All, &PartitionKey::from(*payload_id), continuation)
            .await?)
    }

    pub async fn get_metadata(
        &self,
        payload_id: &PayloadId,
        item_id: &ItemId,
        cancel: &CancellationToken,
    ) -> PayloadResult<MetadataItem> {
        check_cancel(cancel)?;
        Ok(self
            .metadata
            .get(&item_id.to_string(), &PartitionKey::from(*payload_id))
            .await?)
    }

    pub async fn add_data_references<D: DataReference>(
        &self,
        payload_id: &PayloadId,
        partition: &PartitionKey,
        references: &[D],
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<DataReferenceItem>> {
        if references.is_empty() {
            return Err(PayloadError::InvalidArgument("no data references".into()));
        }
        let items = references
            .iter()
            .map(|r| DataReferenceItem::from_reference(*payload_id, r))
            .collect::<Result<Vec<_>, _>>()?;
        self.get(payload_id, partition, cancel).await?;
        self.references.create_many(&items, cancel).await?;
        debug!(payload = %payload_id, count = items.len(), "data references added");
        Ok(items)
    }

    pub async fn list_data_references(
        &self,
        payload_id: &PayloadId,
        continuation: Option<&ContinuationToken>,
        cancel: &CancellationToken,
    ) -> PayloadResult<DataChunk<DataReferenceItem>> {
        check_cancel(cancel)?;
        Ok(self
            .references
            .read_chunk(&Predicate::All, &PartitionKey::from(*payload_id), continuation)
            .await?)
    }

    pub async fn find_data_references(
        &self,
        payload_id: &PayloadId,
        provided_id: &str,
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<DataReferenceItem>> {
        if provided_id.trim().is_empty() {
            return Err(PayloadError::InvalidArgument("provided id is empty".into()));
        }
        Ok(self
            .references
            .scan(
                &Predicate::eq("providedId", provided_id),
                &PartitionKey::from(*payload_id),
                cancel,
            )
            .await?)
    }
}

#[async_trait]
impl MetadataReader for PayloadService {
    async fn list_metadata(
        &self,
        payload_id: &PayloadId,
        continuation: Option<&ContinuationToken>,
        cancel: &CancellationToken,
    ) -> PayloadResult<DataChunk<MetadataItem>> {
        PayloadService::list_metadata(self, payload_id, continuation, cancel).await
    }

    async fn get_metadata(
        &self,
        payload_id: &PayloadId,
        item_id: &ItemId,
        cancel: &CancellationToken,
    ) -> PayloadResult<MetadataItem> {
        PayloadService::get_metadata(self, payload_id, item_id, cancel).await
    }
}

#[async_trait]
impl<M: MetadataRecord + 'static> MetadataWriter<M> for PayloadService {
    async fn add_metadata(
        &self,
        payload_id: &PayloadId,
        partition: &PartitionKey,
        records: &[M],
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<MetadataItem>> {
        PayloadService::add_metadata(self, payload_id, partition, records, cancel).await
    }
}

#[async_trait]
impl DataReferenceReader for PayloadService {
    async fn list_data_references(
        &self,
        payload_id: &PayloadId,
        continuation: Option<&ContinuationToken>,
        cancel: &CancellationToken,
    ) -> PayloadResult<DataChunk<DataReferenceItem>> {
        PayloadService::list_data_references(self, payload_id, continuation, cancel).await
    }

    async fn find_data_references(
        &self,
        payload_id: &PayloadId,
        provided_id: &str,
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<DataReferenceItem>> {
        PayloadService::find_data_references(self, payload_id, provided_id, cancel).await
    }
}

#[async_trait]
impl<D: DataReference + 'static> DataReferenceWriter<D> for PayloadService {
    async fn add_data_references(
        &self,
        payload_id: &PayloadId,
        partition: &PartitionKey,
        references: &[D],
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<DataReferenceItem>> {
        PayloadService::add_data_references(self, payload_id, partition, references, cancel).await
    }
}
