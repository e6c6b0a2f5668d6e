use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::ids::{ItemId, PayloadId};

/// A metadata record that can be attached to a payload.
///
/// The storage key is taken from [`MetadataRecord::item_id`]; a type that
/// cannot name its own id cannot be stored.
pub trait MetadataRecord: Serialize + Send + Sync {
    fn item_id(&self) -> ItemId;
}

/// A data-reference descriptor that can be attached to a payload.
///
/// [`DataReference::provided_id`] is the caller-facing lookup key, derived
/// from the referenced element's group identifier.
pub trait DataReference: Serialize + Send + Sync {
    fn provided_id(&self) -> String;
}

/// One element of a payload's metadata collection.
///
/// Partitioned by the owning payload's id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataItem {
    pub id: ItemId,
    pub payload_id: PayloadId,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MetadataItem {
    pub fn from_record<M: MetadataRecord>(payload_id: PayloadId, record: &M) -> Result<Self, TypeError> {
        let metadata =
            serde_json::to_value(record).map_err(|e| TypeError::Serialization(e.to_string()))?;
        let now = Utc::now();
        Ok(Self {
            id: record.item_id(),
            payload_id,
            metadata,
            created_at: now,
            updated_at: now,
        })
    }
}

/// One element of a payload's data-reference collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataReferenceItem {
    pub id: ItemId,
    pub payload_id: PayloadId,
    pub provided_id: String,
    pub reference: Value,
    pub created_at: DateTime<Utc>,
}

impl DataReferenceItem {
    /// Wrap a descriptor under a freshly generated item id.
    pub fn from_reference<D: DataReference>(
        payload_id: PayloadId,
        reference: &D,
    ) -> Result<Self, TypeError> {
        let provided_id = reference.provided_id();
        if provided_id.trim().is_empty() {
            return Err(TypeError::EmptyField { field: "provided id" });
        }
        let reference =
            serde_json::to_value(reference).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Ok(Self {
            id: ItemId::new(),
            payload_id,
            provided_id,
            reference,
            created_at: Utc::now(),
        })
    }
}

/// Free-form metadata object as received over the wire.
///
/// An `id` field is honoured when present; otherwise one is generated while
/// deserializing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    #[serde(default)]
    pub id: ItemId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl MetadataRecord for MetadataDocument {
    fn item_id(&self) -> ItemId {
        self.id
    }
}

/// Free-form data-reference descriptor as received over the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataReferenceDescriptor {
    pub group_id: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl DataReference for DataReferenceDescriptor {
    fn provided_id(&self) -> String {
        self.group_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Glossary {
        id: ItemId,
        terms: Vec<String>,
    }

    impl MetadataRecord for Glossary {
        fn item_id(&self) -> ItemId {
            self.id
        }
    }

    #[test]
    fn metadata_item_takes_record_id() {
        let record = Glossary {
            id: ItemId::new(),
            terms: vec!["hello".into()],
        };
        let owner = PayloadId::new();
        let item = MetadataItem::from_record(owner, &record).unwrap();
        assert_eq!(item.id, record.id);
        assert_eq!(item.payload_id, owner);
        assert_eq!(item.metadata["terms"], json!(["hello"]));
    }

    #[test]
    fn metadata_document_honours_wire_id() {
        let id = ItemId::new();
        let doc: MetadataDocument =
            serde_json::from_value(json!({"id": id.to_string(), "locale": "fr-FR"})).unwrap();
        assert_eq!(doc.item_id(), id);
        assert_eq!(doc.fields["locale"], "fr-FR");
        assert!(!doc.fields.contains_key("id"));
    }

    #[test]
    fn metadata_document_generates_missing_id() {
        let a: MetadataDocument = serde_json::from_value(json!({"locale": "de"})).unwrap();
        let b: MetadataDocument = serde_json::from_value(json!({"locale": "de"})).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn data_reference_uses_group_id() {
        let descriptor: DataReferenceDescriptor =
            serde_json::from_value(json!({"groupId": "strings/main", "uri": "blob://x"})).unwrap();
        let owner = PayloadId::new();
        let item = DataReferenceItem::from_reference(owner, &descriptor).unwrap();
        assert_eq!(item.provided_id, "strings/main");
        assert_eq!(item.reference["uri"], "blob://x");
        assert_eq!(item.reference["groupId"], "strings/main");
    }

    #[test]
    fn data_reference_requires_provided_id() {
        let descriptor = DataReferenceDescriptor {
            group_id: " ".into(),
            attributes: Map::new(),
        };
        let err = DataReferenceItem::from_reference(PayloadId::new(), &descriptor).unwrap_err();
        assert!(matches!(err, TypeError::EmptyField { .. }));
    }

    #[test]
    fn data_reference_items_get_distinct_ids() {
        let descriptor = DataReferenceDescriptor {
            group_id: "g".into(),
            attributes: Map::new(),
        };
        let owner = PayloadId::new();
        let a = DataReferenceItem::from_reference(owner, &descriptor).unwrap();
        let b = DataReferenceItem::from_reference(owner, &descriptor).unwrap();
        assert_ne!(a.id, b.id);
    }
}
