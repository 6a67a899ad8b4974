//! Engineering narrative generation
//!
//! A fixed-template prompt describing the corbel and its predicted load is
//! sent to a hosted language model. Failures are classified but never retried.

mod gemini;
mod prompt;

pub use gemini::{GeminiClient, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use prompt::{build_prompt, NarrativeInput, PromptLanguage};

use async_trait::async_trait;
use thiserror::Error;

/// Classified failure of the narrative call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NarrativeError {
    #[error("an API key is required to generate the technical report")]
    MissingCredential,
    #[error("could not reach the language model service: {0}")]
    Transport(String),
    #[error("language model service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("malformed language model response: {0}")]
    MalformedResponse(String),
}

impl NarrativeError {
    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            NarrativeError::MissingCredential => "missing_credential",
            NarrativeError::Transport(_) => "transport",
            NarrativeError::Api { .. } => "api",
            NarrativeError::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Trait for narrative backends
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Send one prompt with the caller's credential and return the generated text
    async fn generate(&self, prompt: &str, api_key: &str) -> Result<String, NarrativeError>;

    /// Model identifier used in logs
    fn model_name(&self) -> &str;
}
