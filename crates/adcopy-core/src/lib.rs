pub mod budget;
pub mod conversation;
pub mod provider;

#[cfg(test)]
mod test_support;

pub use budget::{
    count_tokens, default_threshold_for_model, HistoryCompactor, PreparedContext, TokenAccountant,
};
pub use conversation::{
    converse, ChatSession, Conversation, ConverseError, Message, Role, SessionConfig,
};
pub use provider::{CompletionProvider, ProviderError, TimeoutProvider};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
