//! Store error types.

use thiserror::Error;
use warden_types::RecordKey;

/// Failures of store operations. A failed operation never changes the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record '{key}' already exists")]
    DuplicateKey { key: RecordKey },

    #[error("record '{key}' not found")]
    NotFound { key: RecordKey },

    /// The mutation reported an error or its result failed validation.
    #[error("invalid change to '{key}': {reason}")]
    InvalidMutation { key: RecordKey, reason: String },

    /// A restricted delete found records that still reference the key.
    #[error("record '{key}' is referenced by {count} other record(s)")]
    HasDependents { key: RecordKey, count: usize },
}

impl StoreError {
    /// The key the failed operation targeted.
    pub fn key(&self) -> &RecordKey {
        match self {
            Self::DuplicateKey { key }
            | Self::NotFound { key }
            | Self::InvalidMutation { key, .. }
            | Self::HasDependents { key, .. } => key,
        }
    }
}
