use std::time::Duration;

use serde::{Deserialize, Serialize};

use lps_blob::CompressionPolicy;
use lps_store::RetryPolicy;
use lps_types::DEFAULT_MAX_CATEGORY_LEN;

use crate::error::{PayloadError, PayloadResult};

/// Payload placement and transfer policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadConfig {
    /// JSON bodies up to this many serialized bytes are stored inline.
    pub max_inline_bytes: usize,
    pub max_category_len: usize,
    /// Applied to overflow bodies only.
    pub compression: CompressionPolicy,
    /// Deadline for a single blob upload or download.
    pub blob_timeout_ms: u64,
    /// Requested page size for chunked listings; `None` uses the store cap.
    pub page_size: Option<usize>,
    pub retry: RetryPolicy,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            max_inline_bytes: 512 * 1024,
            max_category_len: DEFAULT_MAX_CATEGORY_LEN,
            compression: CompressionPolicy::default(),
            blob_timeout_ms: 30_000,
            page_size: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl PayloadConfig {
    pub fn blob_timeout(&self) -> Duration {
        Duration::from_millis(self.blob_timeout_ms)
    }

    pub fn validate(&self) -> PayloadResult<()> {
        if self.max_category_len == 0 {
            return Err(PayloadError::InvalidArgument(
                "max_category_len must be positive".into(),
            ));
        }
        if self.blob_timeout_ms == 0 {
            return Err(PayloadError::InvalidArgument(
                "blob_timeout_ms must be positive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(PayloadError::InvalidArgument(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.page_size == Some(0) {
            return Err(PayloadError::InvalidArgument("page_size must be positive".into()));
        }
        Ok(())
    }
}
