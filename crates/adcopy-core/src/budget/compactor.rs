//! History compaction for budget management.
//!
//! Keeps a request under a token threshold by replacing the dialogue body with
//! a single synthesized summary while every pinned system message survives.

use std::sync::Arc;

use crate::budget::counter::TokenAccountant;
use crate::budget::summarizer::summarize;
use crate::budget::types::PreparedContext;
use crate::conversation::{ConverseError, Message};
use crate::provider::CompletionProvider;

/// Split messages into pinned system messages and the dialogue body.
///
/// Pinned messages keep their relative order. Earlier history summaries count
/// as body so that repeated compaction folds them into the next summary.
pub fn partition(messages: &[Message]) -> (Vec<Message>, Vec<Message>) {
    messages.iter().cloned().partition(Message::is_pinned)
}

/// Applies the threshold check and, when needed, one summarization pass.
pub struct HistoryCompactor {
    provider: Arc<dyn CompletionProvider>,
    accountant: Arc<TokenAccountant>,
}

impl std::fmt::Debug for HistoryCompactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryCompactor")
            .field("accountant", &self.accountant)
            .finish_non_exhaustive()
    }
}

impl HistoryCompactor {
    pub fn new(provider: Arc<dyn CompletionProvider>, accountant: Arc<TokenAccountant>) -> Self {
        Self {
            provider,
            accountant,
        }
    }

    pub fn provider(&self) -> &dyn CompletionProvider {
        self.provider.as_ref()
    }

    pub fn accountant(&self) -> &TokenAccountant {
        &self.accountant
    }

    /// Prepare `messages` for a model call under `threshold` tokens.
    ///
    /// At or below the threshold the input is returned untouched. Above it, the
    /// body is summarized with one extra completion call and the result is
    /// `pinned + [summary]`. The compacted size is measured but not re-checked.
    pub async fn prepare(
        &self,
        messages: &[Message],
        threshold: u32,
        model: &str,
    ) -> Result<PreparedContext, ConverseError> {
        let tokens_before = self.accountant.count(messages, model);
        if tokens_before <= threshold {
            return Ok(PreparedContext::unchanged(messages.to_vec(), tokens_before));
        }

        let (mut pinned, body) = partition(messages);
        if body.is_empty() {
            tracing::warn!(
                "Pinned messages alone use {} tokens (threshold {}), nothing to summarize",
                tokens_before,
                threshold
            );
            return Ok(PreparedContext::unchanged(messages.to_vec(), tokens_before));
        }

        tracing::debug!(
            "Payload at {} tokens exceeds threshold {}, summarizing {} messages",
            tokens_before,
            threshold,
            body.len()
        );

        let summary = summarize(self.provider.as_ref(), &body, model).await?;
        pinned.push(Message::history_summary(&summary));

        let tokens_after = self.accountant.count(&pinned, model);
        if tokens_after > threshold {
            tracing::warn!(
                "Compacted payload still uses {} tokens (threshold {}); sending it anyway",
                tokens_after,
                threshold
            );
        }

        Ok(PreparedContext {
            messages: pinned,
            tokens_before,
            tokens_after: Some(tokens_after),
            compacted: true,
            turns_summarized: body.len(),
        })
    }
}
