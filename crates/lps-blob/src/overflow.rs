use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use lps_types::{AttachmentReference, PayloadId};

use crate::compression::{decode_optional, CompressionPolicy};
use crate::error::{BlobError, BlobResult};
use crate::traits::BlobStore;

/// Default deadline for one blob transfer.
pub const DEFAULT_BLOB_TIMEOUT: Duration = Duration::from_secs(30);

/// Overflow body storage on top of a [`BlobStore`].
///
/// Handles attachment id allocation, content encoding on write, decoding
/// on read, a deadline per transfer, and tolerant removal.
pub struct OverflowStore {
    backend: Arc<dyn BlobStore>,
    compression: CompressionPolicy,
    timeout: Duration,
}

impl OverflowStore {
    pub fn new(backend: Arc<dyn BlobStore>, compression: CompressionPolicy) -> Self {
        Self {
            backend,
            compression,
            timeout: DEFAULT_BLOB_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn backend(&self) -> &Arc<dyn BlobStore> {
        &self.backend
    }

    async fn deadline<T>(
        &self,
        attachment: &AttachmentReference,
        fut: impl Future<Output = BlobResult<T>>,
    ) -> BlobResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| BlobError::Timeout {
                attachment: attachment.attachment_id.clone(),
                after: self.timeout,
            })?
    }

    /// Upload a body under a fresh attachment id derived from `owner`.
    pub async fn put(
        &self,
        owner: &PayloadId,
        content_type: &str,
        body: Bytes,
    ) -> BlobResult<AttachmentReference> {
        let logical_len = body.len();
        let (encoding, wire) = self.compression.apply(body)?;
        let attachment =
            AttachmentReference::derive(owner, content_type, encoding, wire.len() as u64);
        self.deadline(&attachment, self.backend.upload(&attachment, wire))
            .await?;
        debug!(
            attachment = %attachment.attachment_id,
            logical_len,
            stored_len = attachment.stored_length,
            encoding = ?attachment.content_encoding,
            "overflow body uploaded"
        );
        Ok(attachment)
    }

    /// Download and decode a body.
    pub async fn get(&self, attachment: &AttachmentReference) -> BlobResult<Bytes> {
        let wire = self.get_raw(attachment).await?;
        decode_optional(attachment.content_encoding, wire)
    }

    /// Download the stored bytes without decoding them.
    pub async fn get_raw(&self, attachment: &AttachmentReference) -> BlobResult<Bytes> {
        self.deadline(attachment, self.backend.get(attachment)).await
    }

    /// Remove a blob if it is still there.
    ///
    /// A blob that is already gone is not an error. Returns whether anything
    /// was removed.
    pub async fn remove(&self, attachment: &AttachmentReference) -> BlobResult<bool> {
        if !self
            .deadline(attachment, self.backend.exists(attachment))
            .await?
        {
            debug!(attachment = %attachment.attachment_id, "overflow blob already absent");
            return Ok(false);
        }
        match self
            .deadline(attachment, self.backend.delete(attachment))
            .await
        {
            Ok(removed) => Ok(removed),
            Err(BlobError::NotFound(_)) => Ok(false),
            Err(e) => {
                warn!(attachment = %attachment.attachment_id, error = %e, "overflow blob removal failed");
                Err(e)
            }
        }
    }
}
