//! HTTP language-model client.
//!
//! Implements the `LanguageModel` collaborator contract against a
//! JSON-over-HTTP completion endpoint. Every call carries its own timeout;
//! exceeding it surfaces as `LanguageModelError::Timeout` so the pipeline's
//! retry policy can decide what happens next.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use quorum_core::{Completion, CompletionRequest, LanguageModel, LanguageModelError};

const DEFAULT_MODEL_ID: &str = "quorum-answerer-v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    text: String,
    #[serde(default)]
    tokens_used: u32,
}

pub struct HttpLanguageModel {
    client: reqwest::Client,
    base_url: String,
    model_id: String,
    timeout: Duration,
}

impl HttpLanguageModel {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model_id: &str) -> Self {
        self.model_id = model_id.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<Completion, LanguageModelError> {
        let body = CompletionBody {
            model: &self.model_id,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            model = %self.model_id,
            prompt_length = request.prompt.len(),
            max_tokens = request.max_tokens,
            "sending completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LanguageModelError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    error!(error = %e, "completion transport failed");
                    LanguageModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(status = %status, "completion endpoint rejected request");
            return Err(LanguageModelError::Model(format!(
                "endpoint returned {}: {}",
                status, detail
            )));
        }

        let reply: CompletionReply = response
            .json()
            .await
            .map_err(|e| LanguageModelError::MalformedOutput(e.to_string()))?;

        Ok(Completion {
            text: reply.text,
            tokens_used: reply.tokens_used,
        })
    }
}
