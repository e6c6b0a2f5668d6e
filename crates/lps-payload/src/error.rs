use thiserror::Error;

use lps_blob::BlobError;
use lps_store::StoreError;
use lps_types::{ErrorKind, PayloadId, TypeError};

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload {id} not found in partition {partition}")]
    NotFound { id: PayloadId, partition: String },

    #[error("payload {0} already exists")]
    AlreadyExists(PayloadId),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The document points at a body that cannot be decoded.
    #[error("body of payload {id} is unreadable: {reason}")]
    CorruptBody { id: PayloadId, reason: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl PayloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::Conflict,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::CorruptBody { .. } => ErrorKind::Internal,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Store(e) => e.kind(),
            Self::Blob(e) => e.kind(),
            Self::Type(e) => e.kind(),
        }
    }
}

pub type PayloadResult<T> = Result<T, PayloadError>;
