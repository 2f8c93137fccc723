//! OpenAI-compatible request serialization and response parsing.
//!
//! Any backend that speaks the chat completions API (OpenAI, Azure-style
//! gateways, local servers) accepts the body built here.

use adcopy_core::Message;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::provider::{LLMError, Result};

/// Convert [`Message`] values to an OpenAI-compatible JSON array.
pub fn messages_to_openai_compat_json(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        })
        .collect()
}

/// Build a non-streaming chat completions request body.
pub fn build_openai_compat_body(
    model: &str,
    messages: &[Message],
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages_to_openai_compat_json(messages),
        "stream": false,
    });

    if let Some(temperature) = temperature {
        body["temperature"] = json!(temperature);
    }

    if let Some(max_tokens) = max_output_tokens {
        body["max_tokens"] = json!(max_tokens);
    }

    body
}

#[derive(Debug, Deserialize)]
pub struct OpenAICompatResponse {
    #[allow(dead_code)]
    id: Option<String>,
    #[serde(default)]
    choices: Vec<OpenAICompatChoice>,
    usage: Option<OpenAICompatUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatChoice {
    message: OpenAICompatMessage,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct OpenAICompatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl OpenAICompatResponse {
    pub fn usage(&self) -> Option<OpenAICompatUsage> {
        self.usage
    }

    /// Text of the first choice.
    pub fn into_content(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LLMError::EmptyResponse)
    }
}

/// Parse a chat completions response body and return the reply text.
pub fn parse_openai_compat_response(data: &str) -> Result<String> {
    let response: OpenAICompatResponse = serde_json::from_str(data)?;
    if let Some(usage) = response.usage() {
        log::debug!(
            "Completion usage: prompt={} completion={} total={}",
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens
        );
    }
    response.into_content()
}

/// Pull a readable message out of an OpenAI-style error body, if it has one.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_has_roles_and_no_stream() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("Hi"),
            Message::assistant("Hello!"),
        ];

        let body = build_openai_compat_body("gpt-4o-mini", &messages, Some(0.3), None);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["stream"], false);
        let sent = body["messages"].as_array().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0]["role"], "system");
        assert_eq!(sent[2]["role"], "assistant");
        assert_eq!(sent[2]["content"], "Hello!");
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn body_includes_max_tokens_when_set() {
        let body = build_openai_compat_body("gpt-4o", &[Message::user("Hello")], None, Some(512));
        assert_eq!(body["max_tokens"], 512);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn parses_first_choice_content() {
        let data = r#"{"id":"chatcmpl-1","choices":[{"index":0,"message":{"role":"assistant","content":"Ride on!"},"finish_reason":"stop"}],"usage":{"prompt_tokens":9,"completion_tokens":3,"total_tokens":12}}"#;
        assert_eq!(parse_openai_compat_response(data).unwrap(), "Ride on!");
    }

    #[test]
    fn missing_choices_is_empty_response() {
        let err = parse_openai_compat_response(r#"{"id":"x","choices":[]}"#).unwrap_err();
        assert!(matches!(err, LLMError::EmptyResponse));

        let err = parse_openai_compat_response(
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LLMError::EmptyResponse));
    }

    #[test]
    fn invalid_json_is_json_error() {
        let err = parse_openai_compat_response("{not valid json}").unwrap_err();
        assert!(matches!(err, LLMError::Json(_)));
    }

    #[test]
    fn extracts_api_error_message() {
        let body = r#"{"error":{"message":"Invalid API key","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        assert_eq!(extract_error_message(body).as_deref(), Some("Invalid API key"));
        assert_eq!(extract_error_message("<html>502</html>"), None);
    }
}
