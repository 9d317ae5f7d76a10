//! Collaborator contracts implemented outside the pipeline core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LanguageModelError {
    #[error("Language model call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl LanguageModelError {
    /// Timeouts, malformed output, and transport hiccups are worth
    /// retrying; model-side rejections are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::MalformedOutput(_) | Self::Transport(_)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u32,
}

/// Prompt-in, text-out language model invocation. May fail with timeout or
/// model error; the caller decides retry policy.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest)
        -> Result<Completion, LanguageModelError>;
}
