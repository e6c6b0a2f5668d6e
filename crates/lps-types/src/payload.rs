use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::TypeError;
use crate::ids::PayloadId;
use crate::partition::PartitionKey;

/// Default upper bound on category length, in characters.
pub const DEFAULT_MAX_CATEGORY_LEN: usize = 256;

/// Where a payload's body lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyStorage {
    /// The body (if any) is embedded in the payload document.
    Inline,
    /// A JSON body stored in the overflow blob store.
    BlobOverflow,
    /// An opaque binary body stored in the overflow blob store.
    BinaryBlobOverflow,
}

impl BodyStorage {
    pub fn is_overflow(&self) -> bool {
        !matches!(self, Self::Inline)
    }
}

impl fmt::Display for BodyStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::BlobOverflow => write!(f, "blob-overflow"),
            Self::BinaryBlobOverflow => write!(f, "binary-blob-overflow"),
        }
    }
}

/// Transformation applied to attachment bytes before storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    Zstd,
}

impl ContentEncoding {
    /// Token used in `Content-Encoding` headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zstd => "zstd",
        }
    }
}

impl FromStr for ContentEncoding {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zstd" => Ok(Self::Zstd),
            other => Err(TypeError::UnknownEncoding(other.to_string())),
        }
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pointer from a payload to its body in the overflow blob store.
///
/// Immutable once created. Updating a payload body always produces a fresh
/// reference with a new attachment id; the previous blob is abandoned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentReference {
    pub attachment_id: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<ContentEncoding>,
    /// Number of stored (post-encoding) bytes.
    #[serde(default)]
    pub stored_length: u64,
}

impl AttachmentReference {
    /// Derive a never-reused attachment id for `owner`.
    ///
    /// The id is the owner's id followed by a time-ordered unique suffix.
    pub fn derive(
        owner: &PayloadId,
        content_type: impl Into<String>,
        content_encoding: Option<ContentEncoding>,
        stored_length: u64,
    ) -> Self {
        Self {
            attachment_id: format!("{owner}.{}", Uuid::now_v7().simple()),
            content_type: content_type.into(),
            content_encoding,
            stored_length,
        }
    }

    /// Whether this attachment was derived from `owner`.
    pub fn belongs_to(&self, owner: &PayloadId) -> bool {
        self.attachment_id
            .strip_prefix(&owner.to_string())
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

/// Location of a payload body, as seen by callers mutating it.
#[derive(Clone, Debug, PartialEq)]
pub enum BodyLocation {
    Inline(Option<Value>),
    Blob(AttachmentReference),
    BinaryBlob(AttachmentReference),
}

impl BodyLocation {
    pub fn storage(&self) -> BodyStorage {
        match self {
            Self::Inline(_) => BodyStorage::Inline,
            Self::Blob(_) => BodyStorage::BlobOverflow,
            Self::BinaryBlob(_) => BodyStorage::BinaryBlobOverflow,
        }
    }

    pub fn attachment(&self) -> Option<&AttachmentReference> {
        match self {
            Self::Inline(_) => None,
            Self::Blob(r) | Self::BinaryBlob(r) => Some(r),
        }
    }
}

/// The root document: one logical unit of transferred content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub id: PayloadId,
    pub partition_key: PartitionKey,
    pub category: String,
    pub storage: BodyStorage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentReference>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payload {
    /// A new payload with an empty inline body.
    pub fn new(id: PayloadId, partition_key: PartitionKey, category: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            partition_key,
            category: category.into(),
            storage: BodyStorage::Inline,
            data: None,
            attachment: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the body and refresh `updated_at`.
    pub fn set_body(&mut self, body: BodyLocation) {
        self.storage = body.storage();
        match body {
            BodyLocation::Inline(data) => {
                self.data = data;
                self.attachment = None;
            }
            BodyLocation::Blob(r) | BodyLocation::BinaryBlob(r) => {
                self.data = None;
                self.attachment = Some(r);
            }
        }
        self.touch();
    }

    /// Current body location. Fails if the discriminator and fields disagree.
    pub fn body(&self) -> Result<BodyLocation, TypeError> {
        let mismatch = |reason: &str| TypeError::StorageMismatch {
            storage: self.storage.to_string(),
            reason: reason.to_string(),
        };
        match (self.storage, &self.attachment) {
            (BodyStorage::Inline, None) => Ok(BodyLocation::Inline(self.data.clone())),
            (BodyStorage::Inline, Some(_)) => {
                Err(mismatch("inline body carries an attachment reference"))
            }
            (_, None) => Err(mismatch("overflow body has no attachment reference")),
            (_, Some(_)) if self.data.is_some() => {
                Err(mismatch("overflow body also carries inline data"))
            }
            (BodyStorage::BlobOverflow, Some(r)) => Ok(BodyLocation::Blob(r.clone())),
            (BodyStorage::BinaryBlobOverflow, Some(r)) => Ok(BodyLocation::BinaryBlob(r.clone())),
        }
    }

    pub fn touch(&mut self) {
        let now = Utc::now();
        // Keep updated_at monotonic even if the wall clock steps back.
        self.updated_at = if now > self.updated_at { now } else { self.updated_at };
    }

    /// Check every structural invariant of the document.
    pub fn validate(&self, max_category_len: usize) -> Result<(), TypeError> {
        validate_category(&self.category, max_category_len)?;
        self.validate_storage()
    }

    fn validate_storage(&self) -> Result<(), TypeError> {
        self.body().map(|_| ())
    }
}

/// Categories are required free text with a length cap.
pub fn validate_category(category: &str, max_len: usize) -> Result<(), TypeError> {
    if category.trim().is_empty() {
        return Err(TypeError::EmptyField { field: "category" });
    }
    let len = category.chars().count();
    if len > max_len {
        return Err(TypeError::TooLong {
            field: "category",
            max: max_len,
            actual: len,
        });
    }
    Ok(())
}
