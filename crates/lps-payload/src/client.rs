use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use lps_types::{
    ContinuationToken, DataChunk, DataReferenceDescriptor, DataReferenceItem, ItemId,
    MetadataDocument, MetadataItem, PartitionKey, PayloadId,
};

use crate::error::PayloadResult;
use crate::service::PayloadService;
use crate::traits::{DataReferenceReader, DataReferenceWriter, MetadataReader, MetadataWriter};

/// First-generation client: metadata only.
#[derive(Clone)]
pub struct PayloadClientV1 {
    metadata_reader: Arc<dyn MetadataReader>,
    metadata_writer: Arc<dyn MetadataWriter<MetadataDocument>>,
}

impl PayloadClientV1 {
    pub fn new(
        metadata_reader: Arc<dyn MetadataReader>,
        metadata_writer: Arc<dyn MetadataWriter<MetadataDocument>>,
    ) -> Self {
        Self {
            metadata_reader,
            metadata_writer,
        }
    }

    pub fn from_service(service: Arc<PayloadService>) -> Self {
        Self::new(service.clone(), service)
    }
}

/// Second-generation client: metadata plus data references.
#[derive(Clone)]
pub struct PayloadClientV2 {
    metadata: PayloadClientV1,
    reference_reader: Arc<dyn DataReferenceReader>,
    reference_writer: Arc<dyn DataReferenceWriter<DataReferenceDescriptor>>,
}

impl PayloadClientV2 {
    pub fn new(
        metadata: PayloadClientV1,
        reference_reader: Arc<dyn DataReferenceReader>,
        reference_writer: Arc<dyn DataReferenceWriter<DataReferenceDescriptor>>,
    ) -> Self {
        Self {
            metadata,
            reference_reader,
            reference_writer,
        }
    }

    pub fn from_service(service: Arc<PayloadService>) -> Self {
        Self::new(
            PayloadClientV1::from_service(service.clone()),
            service.clone(),
            service,
        )
    }

    /// The metadata capabilities alone.
    pub fn v1(&self) -> &PayloadClientV1 {
        &self.metadata
    }
}

#[async_trait]
impl MetadataReader for PayloadClientV1 {
    async fn list_metadata(
        &self,
        payload_id: &PayloadId,
        continuation: Option<&ContinuationToken>,
        cancel: &CancellationToken,
    ) -> PayloadResult<DataChunk<MetadataItem>> {
        self.metadata_reader
            .list_metadata(payload_id, continuation, cancel)
            .await
    }

    async fn get_metadata(
        &self,
        payload_id: &PayloadId,
        item_id: &ItemId,
        cancel: &CancellationToken,
    ) -> PayloadResult<MetadataItem> {
        self.metadata_reader
            .get_metadata(payload_id, item_id, cancel)
            .await
    }
}

#[async_trait]
impl MetadataWriter<MetadataDocument> for PayloadClientV1 {
    async fn add_metadata(
        &self,
        payload_id: &PayloadId,
        partition: &PartitionKey,
        records: &[MetadataDocument],
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<MetadataItem>> {
        self.metadata_writer
            .add_metadata(payload_id, partition, records, cancel)
            .await
    }
}

#[async_trait]
impl MetadataReader for PayloadClientV2 {
    async fn list_metadata(
        &self,
        payload_id: &PayloadId,
        continuation: Option<&ContinuationToken>,
        cancel: &CancellationToken,
    ) -> PayloadResult<DataChunk<MetadataItem>> {
        self.metadata
            .list_metadata(payload_id, continuation, cancel)
            .await
    }

    async fn get_metadata(
        &self,
        payload_id: &PayloadId,
        item_id: &ItemId,
        cancel: &CancellationToken,
    ) -> PayloadResult<MetadataItem> {
        self.metadata.get_metadata(payload_id, item_id, cancel).await
    }
}

#[async_trait]
impl MetadataWriter<MetadataDocument> for PayloadClientV2 {
    async fn add_metadata(
        &self,
        payload_id: &PayloadId,
        partition: &PartitionKey,
        records: &[MetadataDocument],
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<MetadataItem>> {
        self.metadata
            .add_metadata(payload_id, partition, records, cancel)
            .await
    }
}

#[async_trait]
impl DataReferenceReader for PayloadClientV2 {
    async fn list_data_references(
        &self,
        payload_id: &PayloadId,
        continuation: Option<&ContinuationToken>,
        cancel: &CancellationToken,
    ) -> PayloadResult<DataChunk<DataReferenceItem>> {
        self.reference_reader
            .list_data_references(payload_id, continuation, cancel)
            .await
    }

    async fn find_data_references(
        &self,
        payload_id: &PayloadId,
        provided_id: &str,
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<DataReferenceItem>> {
        self.reference_reader
            .find_data_references(payload_id, provided_id, cancel)
            .await
    }
}

#[async_trait]
impl DataReferenceWriter<DataReferenceDescriptor> for PayloadClientV2 {
    async fn add_data_references(
        &self,
        payload_id: &PayloadId,
        partition: &PartitionKey,
        references: &[DataReferenceDescriptor],
        cancel: &CancellationToken,
    ) -> PayloadResult<Vec<DataReferenceItem>> {
        self.reference_writer
            .add_data_references(payload_id, partition, references, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use lps_blob::InMemoryBlobStore;
    use lps_store::InMemoryDocumentStore;

    use super::*;
    use crate::body::NewPayload;
    use crate::config::PayloadConfig;

    fn service() -> Arc<PayloadService> {
        Arc::new(
            PayloadService::new(
                Arc::new(InMemoryDocumentStore::new()),
                Arc::new(InMemoryBlobStore::new()),
                PayloadConfig::default(),
            )
            .unwrap(),
        )
    }

    async fn metadata_roundtrip<C>(client: &C, payload: &PayloadId, partition: &PartitionKey)
    where
        C: MetadataReader + MetadataWriter<MetadataDocument>,
    {
        let cancel = CancellationToken::new();
        let record: MetadataDocument = serde_json::from_value(json!({"source": "crowdin"})).unwrap();
        let added = client
            .add_metadata(payload, partition, &[record], &cancel)
            .await
            .unwrap();
        let chunk = client.list_metadata(payload, None, &cancel).await.unwrap();
        assert_eq!(chunk.items, added);
    }

    #[tokio::test]
    async fn both_generations_share_metadata_capabilities() {
        let service = service();
        let cancel = CancellationToken::new();
        let pk = PartitionKey::new("p1").unwrap();

        let a = service.create(NewPayload::new(pk.clone(), "Default"), &cancel).await.unwrap();
        let b = service.create(NewPayload::new(pk.clone(), "Default"), &cancel).await.unwrap();

        metadata_roundtrip(&PayloadClientV1::from_service(service.clone()), &a.id, &pk).await;
        metadata_roundtrip(&PayloadClientV2::from_service(service), &b.id, &pk).await;
    }

    #[tokio::test]
    async fn v2_adds_data_references() {
        let service = service();
        let cancel = CancellationToken::new();
        let pk = PartitionKey::new("p1").unwrap();
        let payload = service
            .create(NewPayload::new(pk.clone(), "Default"), &cancel)
            .await
            .unwrap();

        let client = PayloadClientV2::from_service(service);
        let descriptor: DataReferenceDescriptor =
            serde_json::from_value(json!({"groupId": "checkout", "locale": "ja-JP"})).unwrap();
        client
            .add_data_references(&payload.id, &pk, &[descriptor], &cancel)
            .await
            .unwrap();

        let found = client
            .find_data_references(&payload.id, "checkout", &cancel)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reference["locale"], "ja-JP");
        let listed = client
            .list_data_references(&payload.id, None, &cancel)
            .await
            .unwrap();
        assert_eq!(listed.items, found);

        let v1_view = client.v1().list_metadata(&payload.id, None, &cancel).await.unwrap();
        assert!(v1_view.items.is_empty());

        cancel.cancel();
        let err = client
            .list_data_references(&payload.id, None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::PayloadError::Cancelled));
    }
}
