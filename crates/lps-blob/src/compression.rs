use std::io::Read;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use lps_types::ContentEncoding;

use crate::error::{BlobError, BlobResult};

/// When and how overflow bodies are compressed before upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionPolicy {
    /// Encoding to apply, or `None` to store bodies as-is.
    pub encoding: Option<ContentEncoding>,
    /// zstd compression level.
    pub level: i32,
    /// Bodies smaller than this are never compressed.
    pub min_bytes: usize,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            encoding: Some(ContentEncoding::Zstd),
            level: 3,
            min_bytes: 1024,
        }
    }
}

impl CompressionPolicy {
    pub fn disabled() -> Self {
        Self {
            encoding: None,
            ..Self::default()
        }
    }

    /// Encode `body` for storage. Returns the encoding actually applied.
    pub fn apply(&self, body: Bytes) -> BlobResult<(Option<ContentEncoding>, Bytes)> {
        match self.encoding {
            Some(encoding) if body.len() >= self.min_bytes => {
                Ok((Some(encoding), encode(encoding, &body, self.level)?))
            }
            _ => Ok((None, body)),
        }
    }
}

pub fn encode(encoding: ContentEncoding, data: &[u8], level: i32) -> BlobResult<Bytes> {
    match encoding {
        ContentEncoding::Zstd => zstd::encode_all(data, level)
            .map(Bytes::from)
            .map_err(|e| BlobError::Compression(e.to_string())),
    }
}

pub fn decode(encoding: ContentEncoding, data: &[u8]) -> BlobResult<Bytes> {
    match encoding {
        ContentEncoding::Zstd => zstd::decode_all(data)
            .map(Bytes::from)
            .map_err(|e| BlobError::Compression(e.to_string())),
    }
}

/// Decode untrusted bytes, failing once the output passes `limit`.
pub fn decode_bounded(encoding: ContentEncoding, data: &[u8], limit: usize) -> BlobResult<Bytes> {
    let compression = |e: std::io::Error| BlobError::Compression(e.to_string());
    let mut out = Vec::new();
    match encoding {
        ContentEncoding::Zstd => {
            let decoder = zstd::stream::Decoder::new(data).map_err(compression)?;
            decoder
                .take(limit as u64 + 1)
                .read_to_end(&mut out)
                .map_err(compression)?;
        }
    }
    if out.len() > limit {
        return Err(BlobError::TooLarge { limit });
    }
    Ok(Bytes::from(out))
}

/// Decode wire bytes according to an optional encoding marker.
pub fn decode_optional(encoding: Option<ContentEncoding>, data: Bytes) -> BlobResult<Bytes> {
    match encoding {
        Some(encoding) => decode(encoding, &data),
        None => Ok(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_bodies_stay_plain() {
        let policy = CompressionPolicy::default();
        let (encoding, wire) = policy.apply(Bytes::from_static(b"tiny")).unwrap();
        assert_eq!(encoding, None);
        assert_eq!(wire, Bytes::from_static(b"tiny"));
    }

    #[test]
    fn large_bodies_are_compressed_and_restored() {
        let policy = CompressionPolicy::default();
        let body = Bytes::from("bonjour le monde ".repeat(500));
        let (encoding, wire) = policy.apply(body.clone()).unwrap();
        assert_eq!(encoding, Some(ContentEncoding::Zstd));
        assert!(wire.len() < body.len());
        assert_eq!(decode_optional(encoding, wire).unwrap(), body);
    }

    #[test]
    fn disabled_policy_never_encodes() {
        let body = Bytes::from(vec![7u8; 10_000]);
        let (encoding, wire) = CompressionPolicy::disabled().apply(body.clone()).unwrap();
        assert_eq!(encoding, None);
        assert_eq!(wire, body);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = decode(ContentEncoding::Zstd, b"definitely not zstd").unwrap_err();
        assert!(matches!(err, BlobError::Compression(_)));
    }

    #[test]
    fn bounded_decode_stops_at_limit() {
        let wire = encode(ContentEncoding::Zstd, &vec![0u8; 1 << 20], 3).unwrap();
        assert!(wire.len() < 1024);
        let err = decode_bounded(ContentEncoding::Zstd, &wire, 4096).unwrap_err();
        assert_eq!(err, BlobError::TooLarge { limit: 4096 });
        assert_eq!(err.kind(), lps_types::ErrorKind::InvalidArgument);

        let exact = decode_bounded(ContentEncoding::Zstd, &wire, 1 << 20).unwrap();
        assert_eq!(exact.len(), 1 << 20);
    }

    #[test]
    fn bounded_decode_rejects_garbage() {
        let err = decode_bounded(ContentEncoding::Zstd, b"not zstd at all", 1024).unwrap_err();
        assert!(matches!(err, BlobError::Compression(_)));
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: CompressionPolicy = serde_json::from_str(r#"{"level": 9}"#).unwrap();
        assert_eq!(policy.level, 9);
        assert_eq!(policy.encoding, Some(ContentEncoding::Zstd));
    }
}
