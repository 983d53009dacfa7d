//! Upstream chat-completion provider abstraction.
//!
//! The gateway talks to the model provider through the `ChatProvider`
//! trait so tests can substitute a mock without network access.

pub mod mock;
pub mod openai;

pub use mock::{MockChatProvider, MockFailure};
pub use openai::{OpenAiChatProvider, OpenAiProviderConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::Api { .. } => "api",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::Network(_) => "network",
        }
    }
}

/// Upstream failures surface to the client as a bad-gateway outcome;
/// the provider message never contains credentials.
impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::BadGateway(err.to_string())
    }
}

/// One turn in the upstream conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Fully-resolved parameters for one upstream call; defaults have already
/// been applied by the orchestrating handler.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: i64,
}

/// Token accounting reported by (or estimated for) an upstream response.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

impl TokenUsage {
    /// Rough 4-characters-per-token estimate for responses that omit usage
    /// metadata, so a usage record can always be written.
    pub fn estimate(prompt_chars: usize, completion_chars: usize) -> Self {
        let prompt_tokens = (prompt_chars / 4).max(1) as i64;
        let completion_tokens = (completion_chars / 4).max(1) as i64;
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Result of a successful upstream call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    /// Model as reported upstream, falling back to the requested one.
    pub model: String,
    pub usage: TokenUsage,
}

/// Trait for chat-completion providers.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one completion. No retries: transient failures surface as-is.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
