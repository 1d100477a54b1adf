//! UI-agnostic conversation state types
//!
//! Shared between the TUI and the one-shot CLI path; no dependency on any
//! UI framework.

use serde::{Deserialize, Serialize};

/// A single entry in the chat transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

/// The author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}
