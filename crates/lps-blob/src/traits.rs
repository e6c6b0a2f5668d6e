use async_trait::async_trait;
use bytes::Bytes;

use lps_types::AttachmentReference;

use crate::error::BlobResult;

/// Blob storage backend holding overflow payload bodies.
///
/// Blobs are addressed by [`AttachmentReference::attachment_id`] and hold the
/// exact wire bytes (after any content encoding). Backends never interpret
/// the encoding marker.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, attachment: &AttachmentReference) -> BlobResult<bool>;

    /// Store `data` under the attachment id, replacing any previous bytes.
    async fn upload(&self, attachment: &AttachmentReference, data: Bytes) -> BlobResult<()>;

    /// Fetch the stored bytes. `NotFound` if absent.
    async fn get(&self, attachment: &AttachmentReference) -> BlobResult<Bytes>;

    /// Remove a blob. Returns `true` if it existed.
    async fn delete(&self, attachment: &AttachmentReference) -> BlobResult<bool>;
}
