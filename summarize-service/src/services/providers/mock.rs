//! Mock provider implementation for testing.

use super::{ChatProvider, Completion, CompletionRequest, ProviderError, TokenUsage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scripted failure modes for the mock provider.
#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    Api,
    RateLimited,
    Network,
}

/// Mock chat provider: returns canned content or a scripted failure, and
/// counts calls so tests can assert the upstream was (not) reached.
pub struct MockChatProvider {
    content: String,
    fail_with: Option<MockFailure>,
    calls: AtomicUsize,
}

impl MockChatProvider {
    pub fn respond_with(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_with(failure: MockFailure) -> Self {
        Self {
            content: String::new(),
            fail_with: Some(failure),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(failure) = self.fail_with {
            return Err(match failure {
                MockFailure::Api => ProviderError::Api {
                    status: 500,
                    message: "upstream unavailable".to_string(),
                },
                MockFailure::RateLimited => ProviderError::RateLimited,
                MockFailure::Network => ProviderError::Network("connection reset".to_string()),
            });
        }

        let prompt_chars: usize = request.messages.iter().map(|m| m.content.len()).sum();

        Ok(Completion {
            content: self.content.clone(),
            model: request.model.clone(),
            usage: TokenUsage::estimate(prompt_chars, self.content.len()),
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.fail_with.is_some() {
            Err(ProviderError::NotConfigured(
                "Mock provider scripted to fail".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}
