//! DeepSeek chat-completion client.
//!
//! DeepSeek exposes an OpenAI-compatible `/chat/completions` endpoint, so the
//! wire types here follow that shape. Transient failures (timeouts, connect
//! errors, rate limits, 5xx) are retried with exponential backoff before
//! surfacing as an [`LlmError`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChatMessage, LlmError, TextGenerator};

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Client for DeepSeek's OpenAI-compatible chat API.
pub struct DeepSeekClient {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: Client,
    timeout: Duration,
    max_retries: u32,
}

impl DeepSeekClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 4096,
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
        }
    }

    /// Point at a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn execute_with_retry(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let mut last_error = LlmError::Network("no attempts made".to_string());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * 2u64.pow(attempt - 1));
                debug!(attempt, delay_ms = delay.as_millis(), "retrying chat request");
                tokio::time::sleep(delay).await;
            }

            match self.execute_single_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    warn!(attempt, error = %e, "chat request failed, will retry");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn execute_single_request(
        &self,
        request: &ChatRequest<'_>,
    ) -> Result<ChatResponse, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else if e.is_connect() {
                    LlmError::Connection(e.to_string())
                } else {
                    LlmError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| LlmError::Malformed(e.to_string()));
        }

        let error_text = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(LlmError::Unauthorized),
            429 => Err(LlmError::RateLimited),
            500..=599 => Err(LlmError::Server(status.as_u16(), error_text)),
            _ => Err(LlmError::Http(status.as_u16(), error_text)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for DeepSeekClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self.execute_with_retry(&request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Malformed("response carried no choices".to_string()))?;

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(content)
    }

    fn name(&self) -> &str {
        "deepseek"
    }
}
