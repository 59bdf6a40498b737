//! Bounded chat-history reduction.
//!
//! Derives the role-mapped context passed to the provider on each chat turn
//! from the full UI message log.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::message::{ChatMessage, Sender};

/// Maximum number of log entries forwarded to the provider per chat turn.
///
/// Caps prompt size and cost; fixed, not configurable per call.
pub const MAX_CONTEXT_MESSAGES: usize = 5;

/// Provider-facing conversation role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One entry of the bounded provider context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContextEntry {
    pub role: Role,
    pub text: String,
}

/// Reduce the full message log to the bounded provider context.
///
/// Drops `system` entries, keeps the most recent [`MAX_CONTEXT_MESSAGES`]
/// remaining entries in their original order, and maps `user` to the `user`
/// role and everything else to `model`.
pub fn reduce_history(messages: &[ChatMessage]) -> Vec<ContextEntry> {
    let non_system: Vec<&ChatMessage> = messages
        .iter()
        .filter(|m| m.sender != Sender::System)
        .collect();

    let start = non_system.len().saturating_sub(MAX_CONTEXT_MESSAGES);

    non_system[start..]
        .iter()
        .map(|m| ContextEntry {
            role: match m.sender {
                Sender::User => Role::User,
                _ => Role::Model,
            },
            text: m.text.clone(),
        })
        .collect()
}
