//! Lifecycle error types.

use thiserror::Error;

use vchat_gemini::GeminiError;
use vchat_store::StorageError;

/// Result type for lifecycle operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur driving the lifecycle.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No video has been uploaded for this session")]
    NoMedia,

    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Provider(#[from] GeminiError),
}
