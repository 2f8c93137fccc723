//! Core types for token budget management.

use serde::Serialize;

use crate::conversation::Message;

/// Result of running a payload through the history compactor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedContext {
    /// Messages to send to the model (the input itself when no compaction ran)
    pub messages: Vec<Message>,
    /// Estimated tokens of the payload before any compaction
    pub tokens_before: u32,
    /// Estimated tokens after compaction; informational, never re-checked
    pub tokens_after: Option<u32>,
    /// Whether the dialogue body was replaced by a summary
    pub compacted: bool,
    /// Number of body messages folded into the summary
    pub turns_summarized: usize,
}

impl PreparedContext {
    pub(crate) fn unchanged(messages: Vec<Message>, tokens: u32) -> Self {
        Self {
            messages,
            tokens_before: tokens,
            tokens_after: None,
            compacted: false,
            turns_summarized: 0,
        }
    }

    /// Tokens of the payload actually sent.
    pub fn effective_tokens(&self) -> u32 {
        self.tokens_after.unwrap_or(self.tokens_before)
    }

    /// Percentage of `threshold` used by the payload actually sent.
    pub fn usage_percentage(&self, threshold: u32) -> f64 {
        if threshold == 0 {
            return 0.0;
        }
        (self.effective_tokens() as f64 / threshold as f64) * 100.0
    }
}
