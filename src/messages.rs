//! Role-tagged chat messages and prompt parsing
//!
//! The assembled prompt is flat text; the chat completion service expects
//! structured {role, content} pairs. The parser below reconstructs those
//! pairs line by line from the template's literal role markers. The marker
//! format is fixed by the templates, so the matching is a plain
//! start-of-line prefix check and must stay that way.

use serde::{Deserialize, Serialize};

use crate::prompts::{ROLE_END, ROLE_START};

/// One structured message for the chat completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new<R: Into<String>, C: Into<String>>(role: R, content: C) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Parse a flat role-tagged prompt into structured messages.
///
/// A line starting with the role-start marker sets the active role to the
/// rest of that line; a line starting with the role-end marker is skipped;
/// every other line becomes one message under the active role. Lines seen
/// before any role marker are dropped.
pub fn messages_from_prompt(prompt: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    let mut role: Option<&str> = None;

    for line in prompt.lines() {
        if let Some(rest) = line.strip_prefix(ROLE_START) {
            role = Some(rest);
        } else if line.starts_with(ROLE_END) {
            continue;
        } else if let Some(role) = role {
            messages.push(ChatMessage::new(role, line));
        }
    }

    messages
}
