//! Event-channel message types.
//!
//! Every connected client receives every broadcast event verbatim; there is
//! one shared topic with no per-session scoping.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::message::{AnalysisResult, ChatMessage, ChatTurnResult, Sender};

/// Event-channel message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum EventMessage {
    /// A chat log entry (user question, AI reply, or system notice)
    #[serde(rename = "chat message")]
    ChatMessage {
        text: String,
        sender: Sender,
        timestamp: DateTime<Utc>,
    },

    /// An initial analysis result
    #[serde(rename = "analysis result")]
    AnalysisResult {
        text: String,
        #[serde(rename = "videoUri", skip_serializing_if = "Option::is_none")]
        video_uri: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl EventMessage {
    /// Create a chat message event.
    pub fn chat(sender: Sender, text: impl Into<String>) -> Self {
        EventMessage::ChatMessage {
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    /// Create an analysis result event.
    pub fn analysis(text: impl Into<String>, video_uri: Option<String>) -> Self {
        EventMessage::AnalysisResult {
            text: text.into(),
            video_uri,
            timestamp: Utc::now(),
        }
    }
}

impl From<&ChatMessage> for EventMessage {
    fn from(msg: &ChatMessage) -> Self {
        EventMessage::ChatMessage {
            text: msg.text.clone(),
            sender: msg.sender,
            timestamp: msg.timestamp,
        }
    }
}

impl From<&ChatTurnResult> for EventMessage {
    fn from(result: &ChatTurnResult) -> Self {
        EventMessage::ChatMessage {
            text: result.text.clone(),
            sender: Sender::Ai,
            timestamp: result.timestamp,
        }
    }
}

impl From<&AnalysisResult> for EventMessage {
    fn from(result: &AnalysisResult) -> Self {
        EventMessage::AnalysisResult {
            text: result.text.clone(),
            video_uri: result.video_uri.clone(),
            timestamp: result.timestamp,
        }
    }
}
