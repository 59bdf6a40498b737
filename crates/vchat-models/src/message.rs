//! Chat log and analysis result models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Who produced a chat log entry.
///
/// The backend is the sole producer of `Ai` and `System` entries; `System`
/// entries are informational and never reach the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
    System,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
            Sender::System => "system",
        }
    }
}

/// An entry in the append-only chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(Sender::Ai, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Sender::System, text)
    }
}

/// The initial analysis produced once per successful analyze step.
///
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub text: String,

    /// Provider URI of the analyzed file (remote-upload path only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_uri: Option<String>,

    pub timestamp: DateTime<Utc>,

    #[serde(rename = "type")]
    pub kind: String,
}

impl AnalysisResult {
    pub const KIND: &'static str = "initial-analysis";

    pub fn new(text: impl Into<String>, video_uri: Option<String>) -> Self {
        Self {
            text: text.into(),
            video_uri,
            timestamp: Utc::now(),
            kind: Self::KIND.to_string(),
        }
    }
}

/// The reply produced by one chat turn.
///
/// Not persisted beyond the in-memory session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChatTurnResult {
    pub text: String,

    pub timestamp: DateTime<Utc>,

    #[serde(rename = "type")]
    pub kind: String,
}

impl ChatTurnResult {
    pub const KIND: &'static str = "chat-response";

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
            kind: Self::KIND.to_string(),
        }
    }
}
