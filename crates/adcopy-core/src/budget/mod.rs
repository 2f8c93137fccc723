//! Token budget management for conversations.
//!
//! Counts what a payload costs for a given model and, when it goes over the
//! configured threshold, compacts the dialogue body into a single summary.
//!
//! # Key Components
//!
//! - [`counter`]: Token counting through the model's BPE encoding, with fallbacks
//! - [`limits`]: Model context window limits used to derive default thresholds
//! - [`summarizer`]: Transcript rendering and the summarization call
//! - [`compactor`]: Threshold check and single-pass history compaction
//! - [`types`]: The [`PreparedContext`] returned by compaction

pub mod compactor;
pub mod counter;
pub mod limits;
pub mod summarizer;
pub mod types;

pub use compactor::{partition, HistoryCompactor};
pub use counter::{
    count_tokens, BpeTokenCounter, HeuristicTokenCounter, SharedTokenCounter, TokenAccountant,
    TokenCounter,
};
pub use limits::{default_threshold_for_model, ModelLimit, ModelLimitsRegistry};
pub use summarizer::{render_transcript, summarize, SUMMARIZER_INSTRUCTION};
pub use types::PreparedContext;
