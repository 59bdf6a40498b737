//! Shared data models for the VidChat backend.
//!
//! This crate provides Serde-serializable types for:
//! - Uploaded media assets and their mimetypes
//! - Provider-side file handles and processing states
//! - Chat messages, analysis results and chat turn results
//! - Event-channel message schemas
//! - The bounded chat-history reducer

pub mod event;
pub mod history;
pub mod media;
pub mod message;

// Re-export common types
pub use event::EventMessage;
pub use history::{reduce_history, ContextEntry, Role, MAX_CONTEXT_MESSAGES};
pub use media::{MediaAsset, ProcessingState, RemoteFileHandle, VideoMime};
pub use message::{AnalysisResult, ChatMessage, ChatTurnResult, Sender};
