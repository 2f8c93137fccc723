use adcopy_core::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Completion response contained no message content")]
    EmptyResponse,
}

pub type Result<T> = std::result::Result<T, LLMError>;

impl From<LLMError> for ProviderError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::Http(e) => ProviderError::Transport(e.to_string()),
            LLMError::Json(e) => ProviderError::InvalidResponse(e.to_string()),
            LLMError::Api { status, body } => ProviderError::Api { status, body },
            LLMError::EmptyResponse => {
                ProviderError::InvalidResponse("no message content in response".to_string())
            }
        }
    }
}
