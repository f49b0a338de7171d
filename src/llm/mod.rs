//! Text generation for the coach.
//!
//! Supports:
//! - **Anthropic**: Direct API access via rig-core
//! - **OpenAI**: Direct API access via rig-core
//!
//! Uses the rig-core crate for HTTP transport and the `RigAdapter` to bridge
//! rig's `CompletionModel` trait to our `LlmProvider` trait. Every provider is
//! wrapped in a `TimeoutProvider` by `create_provider`.

pub mod provider;
mod rig_adapter;
pub mod timeout;

pub use provider::*;
pub use rig_adapter::RigAdapter;
pub use timeout::TimeoutProvider;

use std::sync::Arc;
use std::time::Duration;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl std::str::FromStr for LlmBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anthropic" => Ok(LlmBackend::Anthropic),
            "openai" => Ok(LlmBackend::OpenAi),
            other => Err(format!("unknown LLM backend '{other}'")),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub timeout: Duration,
}

impl LlmBackend {
    pub fn name(&self) -> &'static str {
        match self {
            LlmBackend::Anthropic => "anthropic",
            LlmBackend::OpenAi => "openai",
        }
    }
}

/// Build the configured backend, wrapped in the request timeout.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let key = config.api_key.expose_secret();
    let provider = config.backend.name();
    let client_error = |e: &dyn std::fmt::Display| LlmError::RequestFailed {
        provider: provider.to_string(),
        reason: format!("client setup failed: {e}"),
    };

    let inner: Arc<dyn LlmProvider> = match config.backend {
        LlmBackend::Anthropic => {
            use rig::providers::anthropic;
            let client: rig::client::Client<anthropic::client::AnthropicExt> =
                anthropic::Client::new(key).map_err(|e| client_error(&e))?;
            Arc::new(RigAdapter::new(
                client.completion_model(&config.model),
                &config.model,
                provider,
            ))
        }
        LlmBackend::OpenAi => {
            use rig::providers::openai;
            let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
                openai::Client::new(key).map_err(|e| client_error(&e))?;
            Arc::new(RigAdapter::new(
                client.completion_model(&config.model),
                &config.model,
                provider,
            ))
        }
    };

    tracing::info!(provider, model = %config.model, timeout = ?config.timeout, "LLM provider ready");
    Ok(Arc::new(TimeoutProvider::new(inner, config.timeout)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_provider_reports_model() {
        // Keys are only checked on the first request.
        let config = LlmConfig {
            backend: LlmBackend::Anthropic,
            api_key: secrecy::SecretString::from("test-key"),
            model: "claude-3-5-sonnet-latest".to_string(),
            timeout: Duration::from_secs(30),
        };
        let provider = create_provider(&config);
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().model_name(), "claude-3-5-sonnet-latest");
    }

    #[test]
    fn openai_provider_reports_model() {
        let config = LlmConfig {
            backend: LlmBackend::OpenAi,
            api_key: secrecy::SecretString::from("sk-test"),
            model: "gpt-4o".to_string(),
            timeout: Duration::from_secs(30),
        };
        let provider = create_provider(&config);
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().model_name(), "gpt-4o");
    }

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<LlmBackend>(), Ok(LlmBackend::OpenAi));
        assert_eq!("anthropic".parse::<LlmBackend>(), Ok(LlmBackend::Anthropic));
        assert!("gemini".parse::<LlmBackend>().is_err());
    }
}
