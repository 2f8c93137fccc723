//! Conversation summarization for history compaction.
//!
//! The dialogue body is flattened into a transcript and handed to the model
//! behind a dedicated summarizer instruction.

use crate::conversation::{Message, HISTORY_SUMMARY_CLOSE, HISTORY_SUMMARY_OPEN};
use crate::provider::{CompletionProvider, Result};

/// System instruction for the summarization call.
pub const SUMMARIZER_INSTRUCTION: &str = "You are a concise summarizer. Summarize the conversation \
below in a few sentences, keeping every fact, request, decision and piece of draft copy the \
assistant will need to continue it. Reply with the summary only.";

/// Render messages as a transcript: one `role: content` line per turn, in order.
///
/// Continuation lines of multi-line content are indented so every unindented
/// line starts a turn. A previous summary is unwrapped so its text is carried
/// forward instead of its tags.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            if m.is_history_summary() {
                let summary = unwrap_summary(&m.content);
                format!("earlier summary: {}", indent_continuations(summary))
            } else {
                format!("{}: {}", m.role, indent_continuations(&m.content))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent_continuations(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\n', "\n  ")
}

fn unwrap_summary(content: &str) -> &str {
    content
        .trim_start_matches(HISTORY_SUMMARY_OPEN)
        .trim_end_matches(HISTORY_SUMMARY_CLOSE)
        .trim()
}

/// Build the payload for the summarization call.
pub fn summarization_request(body: &[Message]) -> Vec<Message> {
    vec![
        Message::system(SUMMARIZER_INSTRUCTION),
        Message::user(render_transcript(body)),
    ]
}

/// Ask `provider` to summarize `body` with `model`.
pub async fn summarize(
    provider: &dyn CompletionProvider,
    body: &[Message],
    model: &str,
) -> Result<String> {
    let request = summarization_request(body);
    provider.complete(&request, model).await
}
