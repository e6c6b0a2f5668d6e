use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use lps_types::{ErrorKind, TypeError};

/// Retryable failure classes reported by the backing store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransientKind {
    RateLimited,
    ServiceUnavailable,
    Timeout,
    BadGateway,
    GatewayTimeout,
}

impl TransientKind {
    /// HTTP-equivalent status code of the condition.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RateLimited => 429,
            Self::ServiceUnavailable => 503,
            Self::Timeout => 408,
            Self::BadGateway => 502,
            Self::GatewayTimeout => 504,
        }
    }

    /// Classify a raw status code, if it is a transient one.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            429 => Some(Self::RateLimited),
            503 => Some(Self::ServiceUnavailable),
            408 => Some(Self::Timeout),
            502 => Some(Self::BadGateway),
            504 => Some(Self::GatewayTimeout),
            _ => None,
        }
    }
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RateLimited => "rate limited",
            Self::ServiceUnavailable => "service unavailable",
            Self::Timeout => "timeout",
            Self::BadGateway => "bad gateway",
            Self::GatewayTimeout => "gateway timeout",
        };
        write!(f, "{name} ({})", self.status_code())
    }
}

/// Errors from document store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("{collection} document {id} not found in partition {partition}")]
    NotFound {
        collection: String,
        partition: String,
        id: String,
    },

    #[error("{collection} document {id} already exists in partition {partition}")]
    Conflict {
        collection: String,
        partition: String,
        id: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid continuation token: {0}")]
    InvalidContinuationToken(String),

    /// Retryable condition; only the batch writer retries it.
    #[error("transient store failure, {kind}: {message}")]
    Transient {
        kind: TransientKind,
        retry_after: Option<Duration>,
        message: String,
    },

    /// The batch writer spent its attempt budget. Nothing was applied.
    #[error("batch write failed after {attempts} attempts, last failure {kind}: {message}")]
    RetriesExhausted {
        attempts: u32,
        kind: TransientKind,
        message: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt document {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

impl StoreError {
    pub fn transient(kind: TransientKind, message: impl Into<String>) -> Self {
        Self::Transient {
            kind,
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Status code of the transient condition behind this error, if any.
    pub fn transient_status(&self) -> Option<u16> {
        match self {
            Self::Transient { kind, .. } | Self::RetriesExhausted { kind, .. } => {
                Some(kind.status_code())
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::InvalidArgument(_) | Self::InvalidContinuationToken(_) => {
                ErrorKind::InvalidArgument
            }
            Self::Transient { .. } | Self::RetriesExhausted { .. } => ErrorKind::Unavailable,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Serialization(_) | Self::Corrupt { .. } => ErrorKind::Internal,
        }
    }
}

impl From<TypeError> for StoreError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::Serialization(msg) => Self::Serialization(msg),
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
