//! Gateway error types.

use thiserror::Error;

/// Result type for gateway operations.
pub type GeminiResult<T> = Result<T, GeminiError>;

/// Errors that can occur talking to the provider.
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("GEMINI_API_KEY not set")]
    MissingApiKey,

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("No content in provider response")]
    EmptyResponse,

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("File processing did not complete: still {last_state} after {attempts} polls")]
    ProcessingTimeout { last_state: String, attempts: u32 },

    #[error("File processing failed: state {state}")]
    ProcessingFailed { state: String },
}

impl GeminiError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}
