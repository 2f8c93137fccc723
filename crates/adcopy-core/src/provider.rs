//! Completion provider boundary.
//!
//! The core never talks to a model directly; it is handed a
//! [`CompletionProvider`] at session construction and calls it at most twice
//! per turn (summarization, then the reply).

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::conversation::Message;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send role-tagged messages to `model` and return the completion text.
    async fn complete(&self, messages: &[Message], model: &str) -> Result<String>;
}

#[async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for Arc<P> {
    async fn complete(&self, messages: &[Message], model: &str) -> Result<String> {
        (**self).complete(messages, model).await
    }
}

/// Decorates a [`CompletionProvider`] by bounding every call with a timeout.
pub struct TimeoutProvider<P: CompletionProvider> {
    inner: P,
    timeout: Duration,
}

impl<P: CompletionProvider> TimeoutProvider<P> {
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<P: CompletionProvider> CompletionProvider for TimeoutProvider<P> {
    async fn complete(&self, messages: &[Message], model: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.inner.complete(messages, model)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "Completion call to '{}' exceeded {:?}, abandoning it",
                    model,
                    self.timeout
                );
                Err(ProviderError::Timeout(self.timeout))
            }
        }
    }
}
