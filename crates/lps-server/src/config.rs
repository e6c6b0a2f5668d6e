use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use lps_crypto::{SigningKey, VerifyingKey};
use lps_payload::PayloadConfig;
use lps_store::InMemoryConfig;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub payload: PayloadConfig,
    pub store: InMemoryConfig,
    pub signing: SigningConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8470)),
            payload: PayloadConfig::default(),
            store: InMemoryConfig::default(),
            signing: SigningConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load a TOML config file. Missing sections take their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }
}

/// Keys for signed exchanges, hex-encoded.
///
/// Both are optional. A call that asks for signing fails while the key it
/// needs is missing; calls that don't ask are unaffected.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Private key used to sign responses.
    pub server_key_hex: Option<String>,
    /// Public key requests must be signed with.
    pub trusted_client_key_hex: Option<String>,
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("server_key_hex", &self.server_key_hex.as_ref().map(|_| "<redacted>"))
            .field("trusted_client_key_hex", &self.trusted_client_key_hex)
            .finish()
    }
}

impl SigningConfig {
    pub fn keys(&self) -> ServerResult<SigningKeys> {
        let server = self
            .server_key_hex
            .as_deref()
            .map(SigningKey::from_hex)
            .transpose()
            .map_err(|e| ServerError::Config(format!("server_key_hex: {e}")))?;
        let trusted_client = self
            .trusted_client_key_hex
            .as_deref()
            .map(VerifyingKey::from_hex)
            .transpose()
            .map_err(|e| ServerError::Config(format!("trusted_client_key_hex: {e}")))?;
        Ok(SigningKeys {
            server,
            trusted_client,
        })
    }
}

/// Parsed signing keys.
#[derive(Debug, Default)]
pub struct SigningKeys {
    pub server: Option<SigningKey>,
    pub trusted_client: Option<VerifyingKey>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8470".parse::<SocketAddr>().unwrap());
        assert_eq!(c.payload, PayloadConfig::default());
        assert!(c.signing.server_key_hex.is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:9000"

            [payload]
            max_inline_bytes = 2048
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.payload.max_inline_bytes, 2048);
        assert_eq!(c.payload.blob_timeout_ms, PayloadConfig::default().blob_timeout_ms);
        assert_eq!(c.store, InMemoryConfig::default());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = \"127.0.0.1:1234\"").unwrap();
        let c = ServerConfig::load(file.path()).unwrap();
        assert_eq!(c.bind_addr.port(), 1234);
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = ServerConfig::from_toml_str("bind_addr = 5").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn keys_parse_and_redact() {
        let sk = SigningKey::generate();
        let signing = SigningConfig {
            server_key_hex: Some(sk.to_hex()),
            trusted_client_key_hex: Some(sk.verifying_key().to_hex()),
        };
        let keys = signing.keys().unwrap();
        assert_eq!(keys.trusted_client, Some(sk.verifying_key()));
        assert!(keys.server.is_some());
        assert!(!format!("{signing:?}").contains(&sk.to_hex()));
    }

    #[test]
    fn bad_key_is_config_error() {
        let signing = SigningConfig {
            server_key_hex: Some("nothex".into()),
            trusted_client_key_hex: None,
        };
        assert!(matches!(signing.keys(), Err(ServerError::Config(_))));
    }
}
