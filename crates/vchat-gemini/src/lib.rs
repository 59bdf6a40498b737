//! Gemini API gateway.
//!
//! This crate provides:
//! - generateContent calls with inline or file-referenced media
//! - Files API upload (resumable protocol), state polling and deletion
//! - Verbatim generation-config passthrough

pub mod client;
pub mod error;
pub mod types;

pub use client::{GeminiClient, POLL_INTERVAL, POLL_MAX_ATTEMPTS};
pub use error::{GeminiError, GeminiResult};
pub use types::{GenerationConfig, MediaRef};
