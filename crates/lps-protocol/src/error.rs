use thiserror::Error;

use lps_blob::BlobError;
use lps_types::ErrorKind;

use crate::signing::IntegrityError;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Signing was requested but this side holds no key for it.
    #[error("signing requested but no {0} key is configured")]
    KeyNotConfigured(&'static str),

    #[error("unsupported content encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("body encoding error: {0}")]
    Encoding(#[from] BlobError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Integrity(_) => ErrorKind::IntegrityFailure,
            Self::KeyNotConfigured(_) | Self::UnsupportedEncoding(_) => ErrorKind::InvalidArgument,
            Self::Encoding(_) => ErrorKind::InvalidArgument,
            Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
