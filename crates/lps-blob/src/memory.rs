use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use lps_crypto::{ContentDigest, ContentHasher};
use lps_types::AttachmentReference;

use crate::error::{BlobError, BlobResult};
use crate::traits::BlobStore;

struct StoredBlob {
    data: Bytes,
    digest: ContentDigest,
}

/// In-memory blob store.
///
/// Records a BLAKE3 digest of every upload and checks it on download, so
/// tampering through [`InMemoryBlobStore::corrupt`] is reported as
/// `BlobError::Corrupt` rather than returned silently.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    pub fn contains(&self, attachment_id: &str) -> bool {
        self.blobs
            .read()
            .expect("lock poisoned")
            .contains_key(attachment_id)
    }

    /// Total stored bytes.
    pub fn total_bytes(&self) -> usize {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|b| b.data.len())
            .sum()
    }

    /// Overwrite stored bytes without updating the digest.
    pub fn corrupt(&self, attachment_id: &str, data: impl Into<Bytes>) -> bool {
        match self
            .blobs
            .write()
            .expect("lock poisoned")
            .get_mut(attachment_id)
        {
            Some(blob) => {
                blob.data = data.into();
                true
            }
            None => false,
        }
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn exists(&self, attachment: &AttachmentReference) -> BlobResult<bool> {
        Ok(self.contains(&attachment.attachment_id))
    }

    async fn upload(&self, attachment: &AttachmentReference, data: Bytes) -> BlobResult<()> {
        let digest = ContentHasher::ATTACHMENT.digest(&data);
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(attachment.attachment_id.clone(), StoredBlob { data, digest });
        Ok(())
    }

    async fn get(&self, attachment: &AttachmentReference) -> BlobResult<Bytes> {
        let map = self.blobs.read().expect("lock poisoned");
        let blob = map
            .get(&attachment.attachment_id)
            .ok_or_else(|| BlobError::NotFound(attachment.attachment_id.clone()))?;
        if !ContentHasher::ATTACHMENT.verify(&blob.data, &blob.digest) {
            return Err(BlobError::Corrupt {
                attachment: attachment.attachment_id.clone(),
                reason: format!("digest mismatch, expected {}", blob.digest),
            });
        }
        Ok(blob.data.clone())
    }

    async fn delete(&self, attachment: &AttachmentReference) -> BlobResult<bool> {
        Ok(self
            .blobs
            .write()
            .expect("lock poisoned")
            .remove(&attachment.attachment_id)
            .is_some())
    }
}
