/// HTTP endpoint paths for the LPS protocol.
pub mod endpoints {
    pub const HEALTH: &str = "/v1/health";
    pub const PAYLOADS: &str = "/v1/payloads";
    pub const PAYLOAD: &str = "/v1/payloads/:id";
    pub const PAYLOAD_BODY: &str = "/v1/payloads/:id/body";
    pub const METADATA: &str = "/v1/payloads/:id/metadata";
    pub const METADATA_ITEM: &str = "/v1/payloads/:id/metadata/:item_id";
    pub const DATA_REFERENCES: &str = "/v1/payloads/:id/data-references";
}

/// Header names.
pub mod headers {
    /// Hex ed25519 signature over the exact body bytes.
    pub const SIGNATURE: &str = "x-lps-signature";
    /// Set on body downloads to describe the stored representation.
    pub const BODY_STORAGE: &str = "x-lps-body-storage";
}

/// Query parameter names.
pub mod params {
    /// `true` turns on signing for this exchange only.
    pub const REQUIRE_SIGNATURE: &str = "requireSignature";
    pub const PARTITION_KEY: &str = "partitionKey";
    pub const CONTINUATION_TOKEN: &str = "continuationToken";
    pub const PROVIDED_ID: &str = "providedId";
    /// `true` returns overflow bodies in their stored encoding.
    pub const RAW: &str = "raw";
}

/// Health check response.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol_version: u32,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: super::message::PROTOCOL_VERSION,
        }
    }
}
