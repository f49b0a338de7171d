//! The generation gateway seam: one system instruction, one user instruction,
//! one text answer.

use async_trait::async_trait;

use crate::error::LlmError;

/// Token budget used when a caller does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 800;

/// A single-turn completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// The text a provider produced.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
}

/// A text-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Run one request/response exchange. No streaming.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// `generate(system, user, maxTokens) -> text`, trimmed.
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let request = CompletionRequest::new(system, prompt).with_max_tokens(max_tokens);
        let response = self.complete(request).await?;
        Ok(response.content.trim().to_string())
    }
}
