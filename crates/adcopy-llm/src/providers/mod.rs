//! LLM Providers
//!
//! Completion backends that plug into the conversation core.

pub(crate) mod common;
pub mod openai;

pub use openai::OpenAIProvider;
