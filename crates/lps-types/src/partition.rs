use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::PayloadId;

/// Upper bound on partition key length, in characters.
pub const MAX_PARTITION_KEY_LEN: usize = 1024;

/// Key scoping a document to one physically co-located partition.
///
/// Never empty or whitespace-only. Every store operation is evaluated inside
/// exactly one partition; there are no cross-partition scans.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Validate and wrap a partition key.
    pub fn new(key: impl Into<String>) -> Result<Self, TypeError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(TypeError::EmptyPartitionKey);
        }
        let len = key.chars().count();
        if len > MAX_PARTITION_KEY_LEN {
            return Err(TypeError::TooLong {
                field: "partition key",
                max: MAX_PARTITION_KEY_LEN,
                actual: len,
            });
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Child collections are partitioned by their owning payload's id.
impl From<PayloadId> for PartitionKey {
    fn from(id: PayloadId) -> Self {
        Self(id.to_string())
    }
}

impl TryFrom<String> for PartitionKey {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for PartitionKey {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PartitionKey> for String {
    fn from(key: PartitionKey) -> Self {
        key.0
    }
}

impl AsRef<str> for PartitionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartitionKey({:?})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_rejected() {
        assert_eq!(PartitionKey::new(""), Err(TypeError::EmptyPartitionKey));
        assert_eq!(PartitionKey::new("   "), Err(TypeError::EmptyPartitionKey));
    }

    #[test]
    fn overlong_rejected() {
        let err = PartitionKey::new("k".repeat(MAX_PARTITION_KEY_LEN + 1)).unwrap_err();
        assert!(matches!(err, TypeError::TooLong { .. }));
    }

    #[test]
    fn payload_id_becomes_partition() {
        let id = PayloadId::new();
        let key = PartitionKey::from(id);
        assert_eq!(key.as_str(), id.to_string());
    }

    #[test]
    fn serde_validates() {
        let key: PartitionKey = serde_json::from_str("\"p1\"").unwrap();
        assert_eq!(key.as_str(), "p1");
        assert!(serde_json::from_str::<PartitionKey>("\"\"").is_err());
    }
}
