//! Chat history turns and transcript rendering
//!
//! A turn pairs a user utterance with the assistant reply it received (if
//! any). Rendering walks the history newest-first and stops once an
//! approximate character budget is exceeded, so long conversations drop
//! their oldest turns from the transcript.

use serde::{Deserialize, Serialize};

use crate::prompts::{ROLE_END, ROLE_START};

/// Approximate characters per model token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Default history budget in approximate tokens.
pub const DEFAULT_HISTORY_TOKENS: usize = 1000;

/// One conversation turn: a user utterance and the optional assistant reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<String>,
}

impl ChatTurn {
    pub fn new<S: Into<String>>(user: S) -> Self {
        Self {
            user: user.into(),
            bot: None,
        }
    }

    pub fn with_reply<S: Into<String>, R: Into<String>>(user: S, bot: R) -> Self {
        Self {
            user: user.into(),
            bot: Some(bot.into()),
        }
    }
}

/// Render history as a role-tagged transcript, newest turns first.
///
/// Turns are prepended until the accumulated text exceeds
/// `approx_max_tokens * CHARS_PER_TOKEN` characters; earlier turns are
/// dropped. With `include_last_turn = false` the most recent turn is left
/// out (used when the latest user message is substituted separately as the
/// literal question).
pub fn history_as_text(
    history: &[ChatTurn],
    include_last_turn: bool,
    approx_max_tokens: usize,
) -> String {
    let turns = if include_last_turn {
        history
    } else {
        &history[..history.len().saturating_sub(1)]
    };

    let mut history_text = String::new();
    for turn in turns.iter().rev() {
        let bot_block = match &turn.bot {
            Some(reply) if !reply.is_empty() => format!("{}{}", reply, ROLE_END),
            _ => String::new(),
        };
        history_text = format!(
            "{ROLE_START}user\n{}\n{ROLE_END}\n{ROLE_START}assistant\n{}\n{}",
            turn.user, bot_block, history_text
        );
        if history_text.len() > approx_max_tokens * CHARS_PER_TOKEN {
            break;
        }
    }
    history_text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_single_turn_with_reply() {
        let history = vec![ChatTurn::with_reply("What is the notice period?", "30 days.")];

        let text = history_as_text(&history, true, DEFAULT_HISTORY_TOKENS);

        assert!(text.contains("<|im_start|>user\nWhat is the notice period?\n<|im_end|>"));
        assert!(text.contains("<|im_start|>assistant\n30 days.<|im_end|>"));
    }

    #[test]
    fn renders_turn_without_reply_with_empty_assistant_block() {
        let history = vec![ChatTurn::new("Hello")];

        let text = history_as_text(&history, true, DEFAULT_HISTORY_TOKENS);

        assert!(text.contains("<|im_start|>user\nHello\n<|im_end|>"));
        // Assistant block present but carries no reply and no end marker
        assert!(text.contains("<|im_start|>assistant\n"));
        assert_eq!(text.matches("<|im_end|>").count(), 1);
    }

    #[test]
    fn exclude_last_turn_drops_most_recent() {
        let history = vec![
            ChatTurn::with_reply("first question", "first answer"),
            ChatTurn::new("second question"),
        ];

        let text = history_as_text(&history, false, DEFAULT_HISTORY_TOKENS);

        assert!(text.contains("first question"));
        assert!(!text.contains("second question"));
    }

    #[test]
    fn exclude_last_turn_on_single_turn_history_is_empty() {
        let history = vec![ChatTurn::new("only question")];
        let text = history_as_text(&history, false, DEFAULT_HISTORY_TOKENS);
        assert!(text.is_empty());
    }

    #[test]
    fn empty_history_renders_empty() {
        assert!(history_as_text(&[], true, DEFAULT_HISTORY_TOKENS).is_empty());
        assert!(history_as_text(&[], false, DEFAULT_HISTORY_TOKENS).is_empty());
    }

    #[test]
    fn truncation_keeps_newest_turns() {
        // Each turn is far larger than the budget, so only the newest turn
        // (plus the one that crossed the budget) can survive.
        let big = "x".repeat(500);
        let history: Vec<ChatTurn> = (0..10)
            .map(|i| ChatTurn::with_reply(format!("q{} {}", i, big), format!("a{} {}", i, big)))
            .collect();

        let text = history_as_text(&history, true, 100);

        assert!(text.contains("q9"));
        assert!(!text.contains("q0"));
        assert!(!text.contains("q5"));
    }

    #[test]
    fn truncation_is_newest_first_and_approximate() {
        let history: Vec<ChatTurn> = (0..200)
            .map(|i| ChatTurn::with_reply(format!("question number {}", i), "short answer"))
            .collect();

        let text = history_as_text(&history, true, 100);

        // The newest turn always survives; the oldest is dropped first.
        assert!(text.contains("question number 199"));
        assert!(!text.contains("question number 0\n"));
        // Budget is approximate: allow the overshoot of the final prepend.
        assert!(text.len() < 100 * CHARS_PER_TOKEN + 1000);
    }

    #[test]
    fn chat_turn_serde_round_trip() {
        let turn = ChatTurn::with_reply("hi", "hello");
        let json = serde_json::to_string(&turn).unwrap();
        let back: ChatTurn = serde_json::from_str(&json).unwrap();

        assert_eq!(back.user, "hi");
        assert_eq!(back.bot.as_deref(), Some("hello"));
    }

    #[test]
    fn chat_turn_deserializes_without_bot() {
        let turn: ChatTurn = serde_json::from_str(r#"{"user":"question"}"#).unwrap();
        assert_eq!(turn.user, "question");
        assert!(turn.bot.is_none());
    }
}
