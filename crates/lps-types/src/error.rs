use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidId { value: String, reason: String },

    #[error("identifier must not be the nil UUID")]
    NilId,

    #[error("partition key must not be empty")]
    EmptyPartitionKey,

    #[error("{field} exceeds {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("body storage {storage} disagrees with populated fields: {reason}")]
    StorageMismatch { storage: String, reason: String },

    #[error("unknown content encoding: {0}")]
    UnknownEncoding(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TypeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Serialization(_) => ErrorKind::Internal,
            _ => ErrorKind::InvalidArgument,
        }
    }
}

/// Caller-facing failure class shared by every layer.
///
/// Each crate error maps onto exactly one kind so that callers can make
/// retry-vs-abort decisions without matching on crate-specific variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The referenced payload, item, or blob does not exist.
    NotFound,
    /// Creation of an identifier that already exists.
    Conflict,
    /// Malformed input, rejected before any store call.
    InvalidArgument,
    /// Signature absent when required, or signature mismatch.
    IntegrityFailure,
    /// The backing store stayed unavailable after the retry budget.
    Unavailable,
    /// The caller cancelled the operation.
    Cancelled,
    /// Anything else: serialization bugs, corrupted storage.
    Internal,
}

impl ErrorKind {
    /// Whether a caller may reasonably retry the whole operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    /// Stable, lowercase name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidArgument => "invalid_argument",
            Self::IntegrityFailure => "integrity_failure",
            Self::Unavailable => "unavailable",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
