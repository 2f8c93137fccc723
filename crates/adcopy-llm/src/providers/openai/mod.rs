use adcopy_core::provider::{CompletionProvider, Result as ProviderResult};
use adcopy_core::Message;
use async_trait::async_trait;
use reqwest::Client;

use crate::provider::{LLMError, Result};

use super::common::openai_compat::{
    build_openai_compat_body, extract_error_message, parse_openai_compat_response,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Run one non-streaming chat completion and return the reply text.
    pub async fn chat(&self, messages: &[Message], model: &str) -> Result<String> {
        let body =
            build_openai_compat_body(model, messages, self.temperature, self.max_output_tokens);

        log::debug!(
            "OpenAI request: model='{}' messages={} url={}",
            model,
            messages.len(),
            self.endpoint()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            log::warn!("OpenAI request failed with HTTP {}", status);
            return Err(LLMError::Api {
                status: status.as_u16(),
                body: extract_error_message(&text).unwrap_or(text),
            });
        }

        parse_openai_compat_response(&text)
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn complete(&self, messages: &[Message], model: &str) -> ProviderResult<String> {
        self.chat(messages, model).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_provider() {
        let provider = OpenAIProvider::new("test_key");
        assert_eq!(provider.api_key, "test_key");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(provider.temperature, None);
        assert_eq!(provider.max_output_tokens, None);
    }

    #[test]
    fn test_chained_builders() {
        let provider = OpenAIProvider::new("key1")
            .with_base_url("https://custom.openai.com/v1/")
            .with_temperature(0.3)
            .with_max_output_tokens(800);

        assert_eq!(provider.base_url, "https://custom.openai.com/v1");
        assert_eq!(provider.temperature, Some(0.3));
        assert_eq!(provider.max_output_tokens, Some(800));
    }

    #[test]
    fn test_request_url_construction() {
        let provider = OpenAIProvider::new("test_key").with_base_url("https://api.custom.com/v1");
        assert_eq!(
            provider.endpoint(),
            "https://api.custom.com/v1/chat/completions"
        );
    }
}
