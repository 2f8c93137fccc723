//! Conversation data model and the per-turn `converse` operation.

pub mod error;
pub mod session;
pub mod types;

pub use error::ConverseError;
pub use session::{converse, ChatSession, SessionConfig};
pub use types::{Conversation, Message, Role, HISTORY_SUMMARY_CLOSE, HISTORY_SUMMARY_OPEN};
