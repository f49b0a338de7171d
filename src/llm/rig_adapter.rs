//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::agent::AgentBuilder;
use rig::completion::{CompletionModel, Prompt};

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};

/// Wraps any rig completion model. A fresh agent is built per request so the
/// system instruction and token budget can vary call to call.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
}

impl<M> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &'static str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
        }
    }
}

/// Classify a provider failure from its message.
fn classify_error(provider: &str, message: String) -> LlmError {
    let lower = message.to_lowercase();
    if lower.contains("429") || lower.contains("rate limit") {
        LlmError::RateLimited {
            provider: provider.to_string(),
        }
    } else if lower.contains("401") || lower.contains("invalid api key") {
        LlmError::AuthFailed {
            provider: provider.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: message,
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Clone + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let agent = AgentBuilder::new(self.model.clone())
            .preamble(&request.system)
            .max_tokens(u64::from(request.max_tokens))
            .build();

        let content = agent
            .prompt(request.prompt.as_str())
            .await
            .map_err(|e| classify_error(self.provider, e.to_string()))?;

        tracing::debug!(
            model = %self.model_name,
            chars = content.len(),
            "Completion received"
        );
        Ok(CompletionResponse { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_rate_limit() {
        let err = classify_error("openai", "HTTP 429 Too Many Requests".into());
        assert!(matches!(err, LlmError::RateLimited { .. }));
    }

    #[test]
    fn classify_auth() {
        let err = classify_error("openai", "status 401: Invalid API key".into());
        assert!(matches!(err, LlmError::AuthFailed { .. }));
    }

    #[test]
    fn classify_other() {
        let err = classify_error("anthropic", "connection reset".into());
        assert!(matches!(err, LlmError::RequestFailed { ref reason, .. } if reason == "connection reset"));
    }
}
