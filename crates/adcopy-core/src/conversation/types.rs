use serde::{Deserialize, Serialize};

use super::error::ConverseError;

/// Opening tag wrapped around synthesized history summaries.
pub const HISTORY_SUMMARY_OPEN: &str = "<HISTORY_SUMMARY>";
/// Closing tag wrapped around synthesized history summaries.
pub const HISTORY_SUMMARY_CLOSE: &str = "</HISTORY_SUMMARY>";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Build the system message that stands in for a summarized dialogue body.
    pub fn history_summary(summary: &str) -> Self {
        Self::system(format!(
            "{}\n{}\n{}",
            HISTORY_SUMMARY_OPEN,
            summary.trim(),
            HISTORY_SUMMARY_CLOSE
        ))
    }

    /// Whether this message has the shape [`Message::history_summary`] produces.
    pub fn is_history_summary(&self) -> bool {
        self.role == Role::System
            && self.content.starts_with(HISTORY_SUMMARY_OPEN)
            && self.content.ends_with(HISTORY_SUMMARY_CLOSE)
    }

    pub fn is_pinned(&self) -> bool {
        self.role == Role::System && !self.is_history_summary()
    }
}

/// Ordered dialogue owned by a single session.
///
/// Leading `system` messages form the pinned prefix; every later message is a
/// user or assistant turn. Turns are only appended by [`super::converse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<Message>", into = "Vec<Message>")]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a conversation with its pinned system messages.
    pub fn with_pinned<I, S>(pinned: I) -> Result<Self, ConverseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut conversation = Self::new();
        for content in pinned {
            conversation.pin(content)?;
        }
        Ok(conversation)
    }

    /// Pin another system message. Only allowed before the first dialogue turn.
    ///
    /// Text opening with the history summary tag is refused: compaction would
    /// take it for an earlier summary and fold it away.
    pub fn pin(&mut self, content: impl Into<String>) -> Result<(), ConverseError> {
        if self.has_dialogue() {
            return Err(ConverseError::PinAfterDialogue);
        }
        let message = Message::system(content);
        check_pinnable(&message)?;
        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The leading run of system messages.
    pub fn pinned(&self) -> &[Message] {
        let end = self
            .messages
            .iter()
            .position(|m| m.role != Role::System)
            .unwrap_or(self.messages.len());
        &self.messages[..end]
    }

    /// Everything after the pinned prefix.
    pub fn body(&self) -> &[Message] {
        &self.messages[self.pinned().len()..]
    }

    pub fn has_dialogue(&self) -> bool {
        !self.body().is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn push_turn(&mut self, user_text: String, reply: String) {
        self.messages.push(Message::user(user_text));
        self.messages.push(Message::assistant(reply));
    }
}

fn check_pinnable(message: &Message) -> Result<(), ConverseError> {
    if message.content.trim_start().starts_with(HISTORY_SUMMARY_OPEN) {
        return Err(ConverseError::InvalidHistory(format!(
            "pinned messages may not start with {}",
            HISTORY_SUMMARY_OPEN
        )));
    }
    Ok(())
}

impl From<Conversation> for Vec<Message> {
    fn from(conversation: Conversation) -> Self {
        conversation.messages
    }
}

/// Accepts only a pinned system prefix followed by user and assistant turns.
impl TryFrom<Vec<Message>> for Conversation {
    type Error = ConverseError;

    fn try_from(messages: Vec<Message>) -> Result<Self, Self::Error> {
        let mut conversation = Self::new();
        for message in messages {
            if message.role == Role::System {
                if conversation.has_dialogue() {
                    return Err(ConverseError::PinAfterDialogue);
                }
                check_pinnable(&message)?;
            }
            conversation.messages.push(message);
        }
        Ok(conversation)
    }
}
