//! Error types for pipeline-vault
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Discriminated error category, stable across error variants.
///
/// Callers branch on the kind rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input is invalid (non-retryable)
    InvalidArgument,
    /// Save targets an existing key without overwrite
    Conflict,
    /// No artifact resolves for the request
    NotFound,
    /// Payload cannot be encoded or decoded
    Serialization,
    /// Backend list/read/write failed (retryable at caller's discretion)
    Storage,
}

/// pipeline-vault error types
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid caller input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Overwrite guard tripped (Poka-Yoke)
    #[error("Artifact already exists at {key}\nChoose another version or set overwrite to true.")]
    Conflict {
        /// Key that already exists
        key: String,
    },

    /// Nothing resolved for the request
    #[error("Not found: {0}")]
    NotFound(String),

    /// Codec failure
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Backend failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Error category for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::SerializationError(_) | Self::Arrow(_) | Self::Parquet(_) | Self::Json(_) => {
                ErrorKind::Serialization
            }
            Self::StorageError(_) => ErrorKind::Storage,
        }
    }

    /// Whether a caller may reasonably retry the failed operation.
    ///
    /// Only backend failures qualify; this layer never retries internally.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Storage)
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}
