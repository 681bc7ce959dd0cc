//! Text-generation collaborator interface.
//!
//! The workflow core talks to its generation backend through the
//! [`TextGenerator`] trait; the concrete [`DeepSeekClient`] lives in
//! [`deepseek`]. Backends must surface failures as typed errors: an empty
//! reply is [`LlmError::EmptyResponse`], never a silent empty string.

pub mod deepseek;

pub use deepseek::DeepSeekClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role tag for a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message in a conversation.
///
/// The serialized form matches the OpenAI-compatible chat wire format, so
/// messages can go straight into a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Typed errors for generation backends.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("unauthorized - check API key")]
    Unauthorized,

    #[error("rate limited - too many requests")]
    RateLimited,

    #[error("server error ({0}): {1}")]
    Server(u16, String),

    #[error("http error ({0}): {1}")]
    Http(u16, String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("model returned an empty reply")]
    EmptyResponse,
}

impl LlmError {
    /// Transient failures worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Timeout
                | LlmError::Connection(_)
                | LlmError::RateLimited
                | LlmError::Server(_, _)
        )
    }
}

/// Text-generation collaborator.
///
/// Accepts a system instruction plus one or more turns and returns the
/// assistant's reply.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for an ordered conversation.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
