use std::time::Duration;

use lps_types::ErrorKind;

/// Errors from blob storage operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The caller's per-operation deadline elapsed.
    #[error("blob transfer for {attachment} timed out after {after:?}")]
    Timeout { attachment: String, after: Duration },

    #[error("compression error: {0}")]
    Compression(String),

    /// Decoded output would exceed the caller's limit.
    #[error("decoded body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// Stored bytes no longer match what was written.
    #[error("blob {attachment} is corrupt: {reason}")]
    Corrupt { attachment: String, reason: String },

    #[error("blob storage error: {0}")]
    Storage(String),
}

impl BlobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Timeout { .. } | Self::Storage(_) => ErrorKind::Unavailable,
            Self::Compression(_) => ErrorKind::Internal,
            Self::TooLarge { .. } => ErrorKind::InvalidArgument,
            Self::Corrupt { .. } => ErrorKind::IntegrityFailure,
        }
    }
}

/// Result alias for blob operations.
pub type BlobResult<T> = Result<T, BlobError>;
