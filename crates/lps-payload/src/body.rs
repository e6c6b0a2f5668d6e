use bytes::Bytes;
use serde_json::Value;

use lps_types::{BodyStorage, ContentEncoding, PartitionKey, PayloadId};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A body supplied by a caller on create or update.
#[derive(Clone, Debug, PartialEq)]
pub enum BodyInput {
    Empty,
    /// Stored inline when small enough, otherwise in overflow.
    Json(Value),
    /// Always stored in overflow.
    Binary { content_type: String, bytes: Bytes },
}

/// Input to [`crate::PayloadService::create`].
#[derive(Clone, Debug, PartialEq)]
pub struct NewPayload {
    /// Caller-supplied id; one is generated when absent.
    pub id: Option<PayloadId>,
    pub partition_key: PartitionKey,
    pub category: String,
    pub body: BodyInput,
}

impl NewPayload {
    pub fn new(partition_key: PartitionKey, category: impl Into<String>) -> Self {
        Self {
            id: None,
            partition_key,
            category: category.into(),
            body: BodyInput::Empty,
        }
    }

    pub fn with_id(mut self, id: PayloadId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_body(mut self, body: BodyInput) -> Self {
        self.body = body;
        self
    }
}

/// A resolved payload body, decoded to its logical form.
#[derive(Clone, Debug, PartialEq)]
pub enum PayloadBody {
    Empty,
    Json(Value),
    Binary { content_type: String, bytes: Bytes },
}

/// A body in its stored representation, suitable for signed transfer.
#[derive(Clone, Debug, PartialEq)]
pub struct RawBody {
    pub storage: BodyStorage,
    pub content_type: String,
    /// Encoding applied to `bytes`, if any.
    pub encoding: Option<ContentEncoding>,
    pub bytes: Bytes,
}
