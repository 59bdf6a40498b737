//! Upload/analyze/chat lifecycle.
//!
//! This crate provides:
//! - The `Empty → Uploaded → Analyzed → Chatting` state machine
//! - Orchestration of the media store and the provider gateway
//! - Both analysis protocols (inline bytes, remote upload + poll)

pub mod error;
pub mod session;

pub use error::{SessionError, SessionResult};
pub use session::{AnalysisProtocol, Session, SessionPhase, DEFAULT_ANALYSIS_PROMPT};
