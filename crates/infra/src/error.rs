//! Repository-level errors.

use thiserror::Error;

use crate::store::StoreError;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// An identifier (document id, counter name) is malformed.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A unique field already holds the submitted value.
    #[error("`{field}` already exists in `{collection}`")]
    Conflict { collection: String, field: String },

    /// An insert hook refused the document; nothing was written.
    #[error("insert hook `{hook}` failed: {reason}")]
    Hook { hook: &'static str, reason: String },

    /// A value could not be converted to or from a stored document.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { collection, field } => Self::Conflict { collection, field },
            other => Self::Store(other),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
