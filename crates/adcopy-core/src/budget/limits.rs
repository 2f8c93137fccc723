//! Model context window limits registry.
//!
//! Provides known context window sizes for common models, with user overrides
//! loaded from a JSON file. Only used to pick a default compaction threshold
//! when the caller does not configure one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Known model context window sizes.
pub const KNOWN_MODEL_LIMITS: &[(&str, u32)] = &[
    // OpenAI models
    ("gpt-4.1", 1_047_576),
    ("gpt-4.1-mini", 1_047_576),
    ("gpt-4.1-nano", 1_047_576),
    ("gpt-4o", 128_000),
    ("gpt-4o-mini", 128_000),
    ("gpt-4-turbo", 128_000),
    ("gpt-4", 8_192),
    ("gpt-3.5-turbo", 16_385),
    // Anthropic models
    ("claude-3-5-sonnet", 200_000),
    ("claude-3-5-haiku", 200_000),
    ("claude-3-opus", 200_000),
    // Default fallback
    ("default", 128_000),
];

/// Default safety margin for token counting errors.
pub const DEFAULT_SAFETY_MARGIN: u32 = 1000;

/// Cap on the output reserve derived from the context size.
const MAX_OUTPUT_RESERVE: u32 = 16_384;

/// Model limit configuration (user-overridable).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelLimit {
    /// Model identifier (partial match supported, e.g., "gpt-4o" matches "gpt-4o-2024-08-06")
    pub model_pattern: String,
    /// Maximum context window size in tokens
    pub max_context_tokens: u32,
    /// Maximum output tokens (defaults to min(16384, max_context / 4))
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    /// Safety margin for token counting (defaults to 1000)
    #[serde(default)]
    pub safety_margin: Option<u32>,
}

impl ModelLimit {
    pub fn new(model_pattern: impl Into<String>, max_context_tokens: u32) -> Self {
        Self {
            model_pattern: model_pattern.into(),
            max_context_tokens,
            max_output_tokens: None,
            safety_margin: None,
        }
    }

    pub fn get_max_output_tokens(&self) -> u32 {
        self.max_output_tokens
            .unwrap_or_else(|| (self.max_context_tokens / 4).min(MAX_OUTPUT_RESERVE))
    }

    pub fn get_safety_margin(&self) -> u32 {
        self.safety_margin.unwrap_or(DEFAULT_SAFETY_MARGIN)
    }

    /// Tokens available for the request payload once output and margin are reserved.
    pub fn input_budget(&self) -> u32 {
        self.max_context_tokens
            .saturating_sub(self.get_max_output_tokens())
            .saturating_sub(self.get_safety_margin())
    }
}

/// Registry for model limits with built-in defaults and user overrides.
#[derive(Debug, Clone, Default)]
pub struct ModelLimitsRegistry {
    /// User-provided overrides (higher priority than built-in)
    user_limits: HashMap<String, ModelLimit>,
}

impl ModelLimitsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load user overrides from a JSON array of [`ModelLimit`] values.
    ///
    /// A missing file is not an error.
    pub async fn load_user_config(&mut self, path: &Path) -> std::io::Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let limits: Vec<ModelLimit> = serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        for limit in limits {
            self.add_limit(limit);
        }

        tracing::info!(
            "Loaded {} user model limits from {:?}",
            self.user_limits.len(),
            path
        );
        Ok(())
    }

    pub fn add_limit(&mut self, limit: ModelLimit) {
        self.user_limits.insert(limit.model_pattern.clone(), limit);
    }

    /// Get limit for a model, with user overrides taking priority.
    ///
    /// # Matching Strategy
    /// 1. Exact match (user, then built-in)
    /// 2. Longest pattern contained in the model name (user, then built-in)
    pub fn get(&self, model: &str) -> Option<ModelLimit> {
        if let Some(limit) = self.user_limits.get(model) {
            return Some(limit.clone());
        }

        if let Some((_, tokens)) = KNOWN_MODEL_LIMITS.iter().find(|(p, _)| *p == model) {
            return Some(ModelLimit::new(model, *tokens));
        }

        let best_user_match = self
            .user_limits
            .iter()
            .filter(|(pattern, _)| model.contains(pattern.as_str()))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, limit)| limit.clone());

        if best_user_match.is_some() {
            return best_user_match;
        }

        KNOWN_MODEL_LIMITS
            .iter()
            .filter(|(pattern, _)| *pattern != "default" && model.contains(pattern))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(pattern, tokens)| ModelLimit::new(*pattern, *tokens))
    }

    /// Get limit for a model with fallback to default.
    pub fn get_or_default(&self, model: &str) -> ModelLimit {
        self.get(model).unwrap_or_else(|| {
            let default = KNOWN_MODEL_LIMITS
                .iter()
                .find(|(k, _)| *k == "default")
                .map(|(_, v)| *v)
                .unwrap_or(128_000);
            ModelLimit::new("default", default)
        })
    }

    pub fn list_user_limits(&self) -> Vec<&ModelLimit> {
        self.user_limits.values().collect()
    }
}

/// Default compaction threshold for `model` from the built-in table.
pub fn default_threshold_for_model(model: &str) -> u32 {
    ModelLimitsRegistry::default()
        .get_or_default(model)
        .input_budget()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_finds_builtin_by_exact_match() {
        let registry = ModelLimitsRegistry::new();
        let limit = registry.get("gpt-4o").expect("Should find gpt-4o");
        assert_eq!(limit.max_context_tokens, 128_000);
    }

    #[test]
    fn registry_prefers_longest_partial_match() {
        let registry = ModelLimitsRegistry::new();
        // contains both "gpt-4" and "gpt-4o"
        let limit = registry.get("gpt-4o-2024-08-06").unwrap();
        assert_eq!(limit.model_pattern, "gpt-4o");
    }

    #[test]
    fn registry_returns_default_for_unknown() {
        let registry = ModelLimitsRegistry::new();
        assert!(registry.get("unknown-model-xyz").is_none());
        let limit = registry.get_or_default("unknown-model-xyz");
        assert_eq!(limit.model_pattern, "default");
        assert_eq!(limit.max_context_tokens, 128_000);
    }

    #[test]
    fn user_override_takes_precedence() {
        let mut registry = ModelLimitsRegistry::new();
        registry.add_limit(ModelLimit::new("gpt-4o", 64_000));

        let limit = registry.get("gpt-4o").unwrap();
        assert_eq!(limit.max_context_tokens, 64_000);
        assert_eq!(registry.list_user_limits().len(), 1);
    }

    #[test]
    fn input_budget_reserves_output_and_margin() {
        let limit = ModelLimit::new("gpt-4", 8_192);
        // 8192 - 2048 - 1000
        assert_eq!(limit.input_budget(), 5_144);

        let mut custom = ModelLimit::new("tiny", 500);
        custom.max_output_tokens = Some(400);
        custom.safety_margin = Some(200);
        assert_eq!(custom.input_budget(), 0);
    }

    #[test]
    fn default_threshold_uses_builtin_table() {
        // 128000 - 16384 - 1000
        assert_eq!(default_threshold_for_model("gpt-4o-mini"), 110_616);
        assert!(default_threshold_for_model("gpt-4.1-mini") > 1_000_000);
    }

    #[tokio::test]
    async fn loads_user_limits_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_limits.json");
        std::fs::write(
            &path,
            r#"[{"model_pattern":"my-local-model","max_context_tokens":32000,"safety_margin":500}]"#,
        )
        .unwrap();

        let mut registry = ModelLimitsRegistry::new();
        registry.load_user_config(&path).await.unwrap();

        let limit = registry.get("my-local-model-q4").unwrap();
        assert_eq!(limit.max_context_tokens, 32_000);
        assert_eq!(limit.get_safety_margin(), 500);
    }

    #[tokio::test]
    async fn missing_limits_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ModelLimitsRegistry::new();
        tokio_test::assert_ok!(
            registry
                .load_user_config(&dir.path().join("absent.json"))
                .await
        );
        assert!(registry.list_user_limits().is_empty());
    }

    #[tokio::test]
    async fn malformed_limits_file_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_limits.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut registry = ModelLimitsRegistry::new();
        let err = registry.load_user_config(&path).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
