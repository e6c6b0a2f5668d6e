use serde::{Deserialize, Serialize};
use serde_json::Value;

use lps_types::{ContinuationToken, ErrorKind, PartitionKey, PayloadId};

/// Current protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest request body the server accepts (64 MiB).
pub const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// `POST /v1/payloads`
///
/// When `id` is absent the server assigns one. `data` becomes the payload's
/// JSON body, stored inline or in overflow depending on its size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayloadRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PayloadId>,
    pub partition_key: PartitionKey,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Error body returned for every failed call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Query parameters shared by every payload-scoped call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallParams {
    /// Sign the response and verify the request for this call.
    pub require_signature: bool,
    pub partition_key: Option<String>,
    pub continuation_token: Option<String>,
    pub provided_id: Option<String>,
    pub raw: bool,
}

impl CallParams {
    /// The continuation token, with empty strings treated as absent.
    pub fn continuation(&self) -> Option<ContinuationToken> {
        ContinuationToken::from_optional(self.continuation_token.clone())
    }
}
