//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unsupported media type {0:?}: only video files (mp4, webm, mov, avi) are accepted")]
    UnsupportedMime(String),

    #[error("Uploaded file is empty")]
    EmptyUpload,

    #[error("Uploaded file is too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("Invalid filename: {0}")]
    InvalidName(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn unsupported_mime(mime: impl Into<String>) -> Self {
        Self::UnsupportedMime(mime.into())
    }

    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName(name.into())
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }
}
