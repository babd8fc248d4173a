//! Error types for Mizu

use crate::value::StoreKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing key: {0}")]
    MissingKey(StoreKey),

    #[error("invalid store key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("key conflict: '{key}' overlaps existing key '{existing}'")]
    KeyConflict { key: StoreKey, existing: StoreKey },

    #[error("value at '{key}' is not a {expected}")]
    WrongShape { key: StoreKey, expected: &'static str },

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot(message.into())
    }

    pub fn is_missing_key(&self) -> bool {
        matches!(self, Self::MissingKey(_))
    }
}
