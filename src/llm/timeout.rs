//! Caller-side deadline for generation calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};

/// Wraps a provider and fails with `LlmError::Timeout` once the deadline passes.
pub struct TimeoutProvider {
    inner: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl TimeoutProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl LlmProvider for TimeoutProvider {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    model = %self.inner.model_name(),
                    timeout = ?self.timeout,
                    "Generation call timed out"
                );
                Err(LlmError::Timeout {
                    provider: self.inner.model_name().to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }
}
