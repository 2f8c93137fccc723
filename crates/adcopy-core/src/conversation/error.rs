use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum ConverseError {
    #[error("Model call failed: {0}")]
    ModelCallFailed(#[from] ProviderError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("System messages can only be pinned before the first dialogue turn")]
    PinAfterDialogue,

    #[error("Invalid conversation history: {0}")]
    InvalidHistory(String),
}
