//! Builds the pinned prefix a new session starts from.

use std::path::PathBuf;

use adcopy_core::Conversation;
use anyhow::Context;
use chrono::NaiveDate;

use crate::templates::{Category, GENERAL_SYSTEM_PROMPT};

/// Largest context chunk pinned as a single system message.
pub const CONTEXT_CHUNK_CHARS: usize = 50_000;

const CONTEXT_TAG: &str = "<CONTEXT_DATA>";

/// Split `text` into pieces of at most `max_chars` characters.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub category: Option<Category>,
    pub today: NaiveDate,
    pub context_files: Vec<PathBuf>,
}

impl SeedOptions {
    pub fn new(category: Option<Category>, context_files: Vec<PathBuf>) -> Self {
        Self {
            category,
            today: chrono::Local::now().date_naive(),
            context_files,
        }
    }

    /// Pinned system messages in order: instruction, date, then context chunks.
    pub fn pinned_messages(&self) -> anyhow::Result<Vec<String>> {
        let instruction = self
            .category
            .map(Category::system_prompt)
            .unwrap_or(GENERAL_SYSTEM_PROMPT);

        let mut pinned = vec![
            instruction.to_string(),
            format!("Today is {}.", self.today.format("%Y-%m-%d")),
        ];

        for path in &self.context_files {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read context file {}", path.display()))?;
            let chunks = chunk_text(&content, CONTEXT_CHUNK_CHARS);
            tracing::debug!(
                "Pinning {} context chunk(s) from {}",
                chunks.len(),
                path.display()
            );
            pinned.extend(
                chunks
                    .into_iter()
                    .map(|chunk| format!("{}\n{}", CONTEXT_TAG, chunk)),
            );
        }

        Ok(pinned)
    }

    pub fn conversation(&self) -> anyhow::Result<Conversation> {
        Ok(Conversation::with_pinned(self.pinned_messages()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcopy_core::Role;

    fn options(category: Option<Category>, files: Vec<PathBuf>) -> SeedOptions {
        SeedOptions {
            category,
            today: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            context_files: files,
        }
    }

    #[test]
    fn chunking_respects_limit_and_keeps_text() {
        let text = "abcdefghij";
        assert_eq!(chunk_text(text, 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(chunk_text(text, 10), vec![text]);
        assert!(chunk_text("", 4).is_empty());
    }

    #[test]
    fn chunking_counts_characters_not_bytes() {
        let chunks = chunk_text("🐎🐎🐎", 2);
        assert_eq!(chunks, vec!["🐎🐎", "🐎"]);
    }

    #[test]
    fn general_seed_has_prompt_and_date() {
        let convo = options(None, vec![]).conversation().unwrap();
        let messages = convo.messages();

        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.role == Role::System));
        assert!(messages[0].content.starts_with("You are Polo Ad GPT"));
        assert_eq!(messages[1].content, "Today is 2025-06-01.");
    }

    #[test]
    fn category_seed_uses_category_instruction() {
        let pinned = options(Some(Category::Lesson), vec![])
            .pinned_messages()
            .unwrap();
        assert_eq!(pinned[0], Category::Lesson.system_prompt());
    }

    #[test]
    fn large_context_file_is_split_into_tagged_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.json");
        std::fs::write(&path, "x".repeat(CONTEXT_CHUNK_CHARS * 2 + 10)).unwrap();

        let pinned = options(None, vec![path]).pinned_messages().unwrap();

        assert_eq!(pinned.len(), 5);
        for chunk in &pinned[2..] {
            assert!(chunk.starts_with("<CONTEXT_DATA>\n"));
        }
        assert_eq!(pinned[4].len(), "<CONTEXT_DATA>\n".len() + 10);
    }

    #[test]
    fn missing_context_file_is_reported() {
        let err = options(None, vec![PathBuf::from("/nonexistent/context.json")])
            .pinned_messages()
            .unwrap_err();
        assert!(err.to_string().contains("context.json"));
    }
}
