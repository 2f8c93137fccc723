use std::path::{Path, PathBuf};
use std::time::Duration;

use adcopy_core::budget::ModelLimitsRegistry;
use adcopy_core::{ConverseError, SessionConfig};
use adcopy_llm::OpenAIProvider;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const LOCAL_CONFIG_FILE: &str = "adcopy.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: String,
    pub token_threshold: Option<u32>,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    pub model_limits_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            model: DEFAULT_MODEL.to_string(),
            token_threshold: None,
            temperature: DEFAULT_TEMPERATURE,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            model_limits_path: None,
        }
    }
}

/// Command-line overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub token_threshold: Option<u32>,
    pub temperature: Option<f32>,
    pub request_timeout_secs: Option<u64>,
}

fn adcopy_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".adcopy")
}

/// Config files tried in order when no explicit path is given.
pub fn default_config_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from(LOCAL_CONFIG_FILE),
        adcopy_dir().join("config.toml"),
    ]
}

impl AppConfig {
    /// Defaults, then the first config file found, then environment variables.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_paths().into_iter().find(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Some(api_base) = lookup("OPENAI_API_BASE") {
            self.api_base = Some(api_base);
        }
        if let Some(model) = lookup("ADCOPY_MODEL") {
            self.model = model;
        }
        if let Some(threshold) = lookup("ADCOPY_TOKEN_THRESHOLD") {
            self.token_threshold = Some(
                threshold
                    .trim()
                    .parse()
                    .with_context(|| format!("ADCOPY_TOKEN_THRESHOLD is not a number: {threshold:?}"))?,
            );
        }
        if let Some(temperature) = lookup("ADCOPY_TEMPERATURE") {
            self.temperature = temperature
                .trim()
                .parse()
                .with_context(|| format!("ADCOPY_TEMPERATURE is not a number: {temperature:?}"))?;
        }
        if let Some(timeout) = lookup("ADCOPY_TIMEOUT_SECS") {
            self.request_timeout_secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("ADCOPY_TIMEOUT_SECS is not a number: {timeout:?}"))?;
        }
        if let Some(path) = lookup("ADCOPY_MODEL_LIMITS") {
            self.model_limits_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(api_base) = overrides.api_base {
            self.api_base = Some(api_base);
        }
        if let Some(model) = overrides.model {
            self.model = model;
        }
        if let Some(threshold) = overrides.token_threshold {
            self.token_threshold = Some(threshold);
        }
        if let Some(temperature) = overrides.temperature {
            self.temperature = temperature;
        }
        if let Some(timeout) = overrides.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
    }

    /// Configured threshold, or the input budget of the model's context window.
    pub async fn effective_threshold(&self) -> anyhow::Result<u32> {
        if let Some(threshold) = self.token_threshold {
            if threshold == 0 {
                return Err(ConverseError::Configuration(
                    "token threshold must be greater than zero".to_string(),
                )
                .into());
            }
            return Ok(threshold);
        }

        let mut registry = ModelLimitsRegistry::new();
        if let Some(path) = &self.model_limits_path {
            registry
                .load_user_config(path)
                .await
                .with_context(|| format!("failed to load model limits from {}", path.display()))?;
        }
        Ok(registry.get_or_default(&self.model).input_budget())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub async fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let mut config = SessionConfig::new(self.model.clone(), self.effective_threshold().await?);
        config.request_timeout = self.request_timeout();
        Ok(config)
    }

    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => bail!("no API key configured; set OPENAI_API_KEY or api_key in adcopy.toml"),
        }
    }

    pub fn build_provider(&self) -> anyhow::Result<OpenAIProvider> {
        let mut provider =
            OpenAIProvider::new(self.require_api_key()?).with_temperature(self.temperature);
        if let Some(api_base) = &self.api_base {
            provider = provider.with_base_url(api_base.clone());
        }
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.model, "gpt-4.1-mini");
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.request_timeout_secs, 120);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adcopy.toml");
        std::fs::write(&path, "model = \"gpt-4o\"\ntoken_threshold = 5000\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.token_threshold, Some(5000));
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "model = ").unwrap();

        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig {
            model: "gpt-4o".to_string(),
            ..AppConfig::default()
        };
        config
            .apply_env(env(&[
                ("OPENAI_API_KEY", "sk-env"),
                ("ADCOPY_MODEL", "gpt-4.1"),
                ("ADCOPY_TOKEN_THRESHOLD", " 900000 "),
                ("ADCOPY_TEMPERATURE", "0.7"),
                ("ADCOPY_TIMEOUT_SECS", "30"),
            ]))
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.token_threshold, Some(900_000));
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn malformed_env_number_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("ADCOPY_TOKEN_THRESHOLD", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("ADCOPY_TOKEN_THRESHOLD"));
    }

    #[test]
    fn cli_overrides_win_last() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("ADCOPY_MODEL", "gpt-4.1")]))
            .unwrap();
        config.apply_overrides(Overrides {
            model: Some("gpt-4o-mini".to_string()),
            token_threshold: Some(1000),
            ..Overrides::default()
        });

        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.token_threshold, Some(1000));
    }

    #[test]
    fn zero_timeout_disables_decorator() {
        let config = AppConfig {
            request_timeout_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn missing_or_blank_api_key_is_reported() {
        let mut config = AppConfig::default();
        assert!(config.require_api_key().is_err());
        config.api_key = Some("   ".to_string());
        assert!(config.require_api_key().is_err());
        config.api_key = Some("sk-test".to_string());
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
        assert!(config.build_provider().is_ok());
    }

    #[tokio::test]
    async fn threshold_falls_back_to_model_budget() {
        let config = AppConfig {
            model: "gpt-4o".to_string(),
            ..AppConfig::default()
        };
        // 128000 - 16384 - 1000
        assert_eq!(config.effective_threshold().await.unwrap(), 110_616);

        let explicit = AppConfig {
            token_threshold: Some(900_000),
            ..AppConfig::default()
        };
        assert_eq!(explicit.effective_threshold().await.unwrap(), 900_000);
    }

    #[tokio::test]
    async fn threshold_uses_user_model_limits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("limits.json");
        std::fs::write(
            &path,
            r#"[{"model_pattern":"house-model","max_context_tokens":20000,"max_output_tokens":4000,"safety_margin":1000}]"#,
        )
        .unwrap();

        let config = AppConfig {
            model: "house-model-v2".to_string(),
            model_limits_path: Some(path),
            ..AppConfig::default()
        };
        assert_eq!(config.effective_threshold().await.unwrap(), 15_000);

        let session = config.session_config().await.unwrap();
        assert_eq!(session.token_threshold, 15_000);
        assert_eq!(session.request_timeout, Some(Duration::from_secs(120)));
    }

    #[tokio::test]
    async fn zero_threshold_is_a_configuration_error() {
        let config = AppConfig {
            token_threshold: Some(0),
            ..AppConfig::default()
        };

        let err = config.effective_threshold().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConverseError>(),
            Some(ConverseError::Configuration(_))
        ));
        assert!(config.session_config().await.is_err());
    }
}
