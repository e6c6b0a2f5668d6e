use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter evaluated by a store backend against document bodies.
///
/// Paths are dotted field names (`"payloadId"`, `"reference.locale"`); a
/// numeric segment indexes into an array. This is the only filter language
/// the store offers, and it is always evaluated inside a single partition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Predicate {
    All,
    Eq { path: String, value: Value },
    /// Matches when the field is missing or differs.
    Ne { path: String, value: Value },
    Exists { path: String },
    And { all: Vec<Predicate> },
    Or { any: Vec<Predicate> },
    Not { inner: Box<Predicate> },
}

impl Predicate {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn exists(path: impl Into<String>) -> Self {
        Self::Exists { path: path.into() }
    }

    /// Conjunction, flattening nested `And`s and dropping `All`.
    pub fn and(self, other: Predicate) -> Self {
        let mut all = Vec::new();
        for p in [self, other] {
            match p {
                Self::All => {}
                Self::And { all: inner } => all.extend(inner),
                p => all.push(p),
            }
        }
        match all.len() {
            0 => Self::All,
            1 => all.remove(0),
            _ => Self::And { all },
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        Self::Or {
            any: vec![self, other],
        }
    }

    pub fn negate(self) -> Self {
        Self::Not {
            inner: Box::new(self),
        }
    }

    /// Evaluate against a document body.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Eq { path, value } => lookup(doc, path) == Some(value),
            Self::Ne { path, value } => lookup(doc, path) != Some(value),
            Self::Exists { path } => lookup(doc, path).is_some_and(|v| !v.is_null()),
            Self::And { all } => all.iter().all(|p| p.matches(doc)),
            Self::Or { any } => any.iter().any(|p| p.matches(doc)),
            Self::Not { inner } => !inner.matches(doc),
        }
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::All
    }
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
