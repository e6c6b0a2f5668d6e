use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use lps_types::{DataReferenceItem, MetadataItem, PartitionKey, Payload};

use crate::error::{StoreError, StoreResult};

/// Collection holding payload documents, partitioned by their explicit key.
pub const PAYLOADS: &str = "payloads";
/// Collection holding metadata items, partitioned by owning payload id.
pub const METADATA: &str = "metadata";
/// Collection holding data-reference items, partitioned by owning payload id.
pub const DATA_REFERENCES: &str = "dataReferences";

/// A document as held by a backend: addressing plus an uninterpreted body.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub partition: PartitionKey,
    pub body: Value,
}

/// A typed document living in one partitioned collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the collection holding this document type.
    const COLLECTION: &'static str;

    fn document_id(&self) -> String;

    fn partition_key(&self) -> PartitionKey;

    fn to_stored(&self) -> StoreResult<StoredDocument> {
        Ok(StoredDocument {
            id: self.document_id(),
            partition: self.partition_key(),
            body: serde_json::to_value(self)?,
        })
    }

    fn from_stored(doc: &StoredDocument) -> StoreResult<Self> {
        serde_json::from_value(doc.body.clone()).map_err(|e| StoreError::Corrupt {
            id: doc.id.clone(),
            reason: e.to_string(),
        })
    }
}

impl Document for Payload {
    const COLLECTION: &'static str = PAYLOADS;

    fn document_id(&self) -> String {
        self.id.to_string()
    }

    fn partition_key(&self) -> PartitionKey {
        self.partition_key.clone()
    }
}

impl Document for MetadataItem {
    const COLLECTION: &'static str = METADATA;

    fn document_id(&self) -> String {
        self.id.to_string()
    }

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::from(self.payload_id)
    }
}

impl Document for DataReferenceItem {
    const COLLECTION: &'static str = DATA_REFERENCES;

    fn document_id(&self) -> String {
        self.id.to_string()
    }

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::from(self.payload_id)
    }
}
