use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use lps_payload::PayloadError;
use lps_protocol::{ErrorResponse, ProtocolError};
use lps_types::{ErrorKind, TypeError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TypeError> for ServerError {
    fn from(e: TypeError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::InvalidArgument,
            Self::Payload(e) => e.kind(),
            Self::Protocol(e) => e.kind(),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// HTTP status for a failure kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::IntegrityFailure => StatusCode::UNAUTHORIZED,
        ErrorKind::Unavailable | ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            error!(kind = %kind, error = %self, "request failed");
        } else if kind == ErrorKind::IntegrityFailure {
            warn!(error = %self, "rejected unsigned or tampered request");
        }
        (status, Json(ErrorResponse::new(kind, self.to_string()))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
