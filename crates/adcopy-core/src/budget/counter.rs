//! Token counting for budget management.
//!
//! Counts are approximations: only message `content` is tokenized, role tags
//! and request framing are ignored. A tokenizer is picked per model through
//! tiktoken; unknown models fall back to `cl100k_base`, and if no BPE table can
//! be loaded at all a character heuristic is used instead.

use crate::conversation::Message;
use dashmap::DashMap;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

/// Encoding used when a model has no known tokenizer mapping.
pub const FALLBACK_ENCODING: &str = "cl100k_base";

/// Trait for token counting implementations.
pub trait TokenCounter: Send + Sync {
    /// Count tokens in a plain text string.
    fn count_text(&self, text: &str) -> u32;

    /// Count tokens across the content of several messages.
    fn count_messages(&self, messages: &[Message]) -> u32 {
        messages
            .iter()
            .fold(0u32, |acc, m| acc.saturating_add(self.count_text(&m.content)))
    }

    /// Human-readable name of the tokenizer, for logs.
    fn name(&self) -> &str;
}

/// Arc-wrapped token counter for easy sharing.
pub type SharedTokenCounter = Arc<dyn TokenCounter>;

/// Counter backed by a tiktoken BPE table.
pub struct BpeTokenCounter {
    bpe: CoreBPE,
    encoding: String,
}

impl BpeTokenCounter {
    pub fn new(bpe: CoreBPE, encoding: impl Into<String>) -> Self {
        Self {
            bpe,
            encoding: encoding.into(),
        }
    }

    /// Load the tokenizer tiktoken maps `model` to, if there is one.
    pub fn for_model(model: &str) -> Option<Self> {
        let tokenizer = tiktoken_rs::tokenizer::get_tokenizer(model)?;
        let encoding = format!("{:?}", tokenizer);
        match tiktoken_rs::get_bpe_from_tokenizer(tokenizer) {
            Ok(bpe) => Some(Self::new(bpe, encoding)),
            Err(e) => {
                tracing::debug!("Failed to load tokenizer {} for '{}': {}", encoding, model, e);
                None
            }
        }
    }

    /// Load the general-purpose fallback encoding.
    pub fn fallback() -> Option<Self> {
        match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(Self::new(bpe, FALLBACK_ENCODING)),
            Err(e) => {
                tracing::debug!("Failed to load {}: {}", FALLBACK_ENCODING, e);
                None
            }
        }
    }
}

impl std::fmt::Debug for BpeTokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeTokenCounter")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl TokenCounter for BpeTokenCounter {
    fn count_text(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        let tokens = self.bpe.encode_with_special_tokens(text).len();
        u32::try_from(tokens).unwrap_or(u32::MAX)
    }

    fn name(&self) -> &str {
        &self.encoding
    }
}

/// Heuristic token counter using character-based estimation.
///
/// Uses the approximation: tokens ≈ characters / 4. Only reached when no BPE
/// table can be loaded.
#[derive(Debug, Clone)]
pub struct HeuristicTokenCounter {
    /// Characters per token ratio (default: 4)
    chars_per_token: f64,
}

impl HeuristicTokenCounter {
    pub fn new(chars_per_token: f64) -> Self {
        Self { chars_per_token }
    }
}

impl Default for HeuristicTokenCounter {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl TokenCounter for HeuristicTokenCounter {
    fn count_text(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }

        let char_count = text.chars().count() as f64;
        (char_count / self.chars_per_token).ceil() as u32
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// Resolves and caches one tokenizer per model identifier.
///
/// Never fails: an unrecognised model silently gets the fallback encoding.
#[derive(Default)]
pub struct TokenAccountant {
    counters: DashMap<String, SharedTokenCounter>,
}

impl TokenAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizer used for `model`, loading it on first use.
    pub fn counter_for(&self, model: &str) -> SharedTokenCounter {
        if let Some(counter) = self.counters.get(model) {
            return Arc::clone(counter.value());
        }

        let counter = resolve_counter(model);
        self.counters
            .entry(model.to_string())
            .or_insert(counter)
            .value()
            .clone()
    }

    /// Estimated token cost of `messages` under `model`'s tokenizer.
    pub fn count(&self, messages: &[Message], model: &str) -> u32 {
        self.counter_for(model).count_messages(messages)
    }

    pub fn count_text(&self, text: &str, model: &str) -> u32 {
        self.counter_for(model).count_text(text)
    }
}

impl std::fmt::Debug for TokenAccountant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAccountant")
            .field("cached_models", &self.counters.len())
            .finish()
    }
}

fn resolve_counter(model: &str) -> SharedTokenCounter {
    if let Some(counter) = BpeTokenCounter::for_model(model) {
        tracing::debug!("Using {} tokenizer for model '{}'", counter.name(), model);
        return Arc::new(counter);
    }

    tracing::debug!(
        "No tokenizer mapping for model '{}', falling back to {}",
        model,
        FALLBACK_ENCODING
    );
    if let Some(counter) = BpeTokenCounter::fallback() {
        return Arc::new(counter);
    }

    tracing::warn!("No BPE tables available, using heuristic token counts");
    Arc::new(HeuristicTokenCounter::default())
}

/// One-off count without keeping a tokenizer cache around.
pub fn count_tokens(messages: &[Message], model: &str) -> u32 {
    TokenAccountant::new().count(messages, model)
}
