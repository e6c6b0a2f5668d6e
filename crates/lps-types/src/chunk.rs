use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque cursor returned by a paged scan.
///
/// The contents are owned by the store backend that issued the token and
/// are never parsed or reformatted anywhere else. Some backends put escaped
/// JSON in here; it must survive every hop byte-for-byte.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Treat `None` and empty strings alike: no further pages.
    pub fn from_optional(raw: Option<String>) -> Option<Self> {
        raw.filter(|s| !s.is_empty()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationToken({} bytes)", self.0.len())
    }
}

/// One page of a chunked read.
///
/// A `None` token means the traversal is complete.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataChunk<T> {
    pub items: Vec<T>,
    #[serde(default, deserialize_with = "empty_token_is_none")]
    pub continuation_token: Option<ContinuationToken>,
}

impl<T> DataChunk<T> {
    pub fn new(items: Vec<T>, continuation_token: Option<ContinuationToken>) -> Self {
        Self {
            items,
            continuation_token,
        }
    }

    /// The final (or only) page.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    pub fn has_more(&self) -> bool {
        self.continuation_token.is_some()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> DataChunk<U> {
        DataChunk {
            items: self.items.into_iter().map(f).collect(),
            continuation_token: self.continuation_token,
        }
    }
}

fn empty_token_is_none<'de, D>(deserializer: D) -> Result<Option<ContinuationToken>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(ContinuationToken::from_optional(raw))
}
