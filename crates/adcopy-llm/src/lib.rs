pub mod provider;
pub mod providers;

pub use provider::{LLMError, Result};
pub use providers::OpenAIProvider;
