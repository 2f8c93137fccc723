use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::error::ConverseError;
use super::types::{Conversation, Message};
use crate::budget::{HistoryCompactor, PreparedContext, TokenAccountant};
use crate::provider::{CompletionProvider, TimeoutProvider};

/// Per-session settings, validated once when the session is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub model: String,
    pub token_threshold: u32,
    pub request_timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn new(model: impl Into<String>, token_threshold: u32) -> Self {
        Self {
            model: model.into(),
            token_threshold,
            request_timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<(), ConverseError> {
        if self.model.trim().is_empty() {
            return Err(ConverseError::Configuration(
                "model identifier must not be empty".to_string(),
            ));
        }
        if self.token_threshold == 0 {
            return Err(ConverseError::Configuration(
                "token threshold must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout == Some(Duration::ZERO) {
            return Err(ConverseError::Configuration(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Run one dialogue turn against `history`.
///
/// The candidate payload is the history plus the new user message, compacted
/// first when it exceeds `threshold`. On success the user text and the reply
/// are appended (exactly two messages); on any failure `history` is untouched.
pub async fn converse(
    compactor: &HistoryCompactor,
    history: &mut Conversation,
    new_user_text: &str,
    model: &str,
    threshold: u32,
) -> Result<String, ConverseError> {
    converse_prepared(compactor, history, new_user_text, model, threshold)
        .await
        .map(|(reply, _)| reply)
}

pub(crate) async fn converse_prepared(
    compactor: &HistoryCompactor,
    history: &mut Conversation,
    new_user_text: &str,
    model: &str,
    threshold: u32,
) -> Result<(String, PreparedContext), ConverseError> {
    let mut candidate = history.messages().to_vec();
    candidate.push(Message::user(new_user_text));

    let prepared = compactor.prepare(&candidate, threshold, model).await?;
    let reply = compactor.provider().complete(&prepared.messages, model).await?;

    history.push_turn(new_user_text.to_string(), reply.clone());
    Ok((reply, prepared))
}

/// A conversation bound to one model, threshold and provider.
#[derive(Debug)]
pub struct ChatSession {
    id: String,
    config: SessionConfig,
    compactor: HistoryCompactor,
    history: Conversation,
    last_prepared: Option<PreparedContext>,
}

impl ChatSession {
    pub fn new(
        config: SessionConfig,
        provider: Arc<dyn CompletionProvider>,
        history: Conversation,
    ) -> Result<Self, ConverseError> {
        Self::with_accountant(config, provider, Arc::new(TokenAccountant::new()), history)
    }

    /// Build a session that shares a token accountant (and its tokenizer cache).
    pub fn with_accountant(
        config: SessionConfig,
        provider: Arc<dyn CompletionProvider>,
        accountant: Arc<TokenAccountant>,
        history: Conversation,
    ) -> Result<Self, ConverseError> {
        config.validate()?;

        let provider: Arc<dyn CompletionProvider> = match config.request_timeout {
            Some(timeout) => Arc::new(TimeoutProvider::new(provider, timeout)),
            None => provider,
        };

        let id = Uuid::new_v4().to_string();
        tracing::debug!(
            session_id = %id,
            model = %config.model,
            threshold = config.token_threshold,
            "Chat session created"
        );

        Ok(Self {
            id,
            config,
            compactor: HistoryCompactor::new(provider, accountant),
            history,
            last_prepared: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn history(&self) -> &Conversation {
        &self.history
    }

    /// Context actually sent on the most recent successful turn.
    pub fn last_prepared(&self) -> Option<&PreparedContext> {
        self.last_prepared.as_ref()
    }

    /// Tokens the stored history costs for this session's model.
    pub fn token_count(&self) -> u32 {
        self.compactor
            .accountant()
            .count(self.history.messages(), &self.config.model)
    }

    pub async fn converse(&mut self, new_user_text: &str) -> Result<String, ConverseError> {
        let result = converse_prepared(
            &self.compactor,
            &mut self.history,
            new_user_text,
            &self.config.model,
            self.config.token_threshold,
        )
        .await;

        match result {
            Ok((reply, prepared)) => {
                if prepared.compacted {
                    tracing::info!(
                        session_id = %self.id,
                        "Compacted {} messages: {} -> {} tokens",
                        prepared.turns_summarized,
                        prepared.tokens_before,
                        prepared.effective_tokens()
                    );
                }
                self.last_prepared = Some(prepared);
                Ok(reply)
            }
            Err(e) => {
                tracing::error!(session_id = %self.id, "Turn failed: {}", e);
                Err(e)
            }
        }
    }
}
