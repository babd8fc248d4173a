//! Store keys and values

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Dotted path naming a value in a state store, e.g. `mint.mint_cap`.
///
/// Segments are non-empty and use ASCII letters, digits, `_` or `-`.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct StoreKey(Arc<str>);

impl StoreKey {
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::invalid_key(s, "empty key"));
        }
        for segment in s.split('.') {
            if segment.is_empty() {
                return Err(Error::invalid_key(s, "empty segment"));
            }
            if let Some(c) = segment
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
            {
                return Err(Error::invalid_key(s, format!("illegal character '{}'", c)));
            }
        }
        Ok(Self(Arc::from(s)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// `mint` is an ancestor of `mint.mint_cap`; a key is not its own ancestor.
    pub fn is_ancestor_of(&self, other: &StoreKey) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&*self.0)
            && other.0.as_bytes()[self.0.len()] == b'.'
    }

    /// True when one key is an ancestor of the other; the two cannot coexist in a snapshot.
    pub fn overlaps(&self, other: &StoreKey) -> bool {
        self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StoreKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for StoreKey {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StoreKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

/// A leaf value: object ids and addresses are text, settings are numbers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            Self::Text(_) => None,
        }
    }

    /// Parses CLI input: integers become numbers, everything else stays text.
    pub fn infer(raw: &str) -> Self {
        match raw.parse::<u64>() {
            Ok(n) => Self::Number(n.into()),
            Err(_) => Self::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<u64> for Scalar {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

/// What a read returns: a scalar, or the record of everything nested under the key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StoreValue {
    Scalar(Scalar),
    Record(BTreeMap<String, StoreValue>),
}

impl StoreValue {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Record(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(|s| s.as_str())
    }

    pub fn as_record(&self) -> Option<&BTreeMap<String, StoreValue>> {
        match self {
            Self::Record(r) => Some(r),
            Self::Scalar(_) => None,
        }
    }
}

impl From<Scalar> for StoreValue {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}
