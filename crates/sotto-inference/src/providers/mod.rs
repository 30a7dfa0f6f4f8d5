//! Direct LLM provider clients.
//!
//! These are the fallback tier behind the orchestrator routes: each provider
//! speaks its own REST dialect but is exposed through the uniform
//! [`ChatCompletionProvider`](sotto_core::ChatCompletionProvider) trait.
//! OpenAI and Grok share the chat-completions wire format; Gemini has its
//! own `generateContent` shapes.

use std::sync::Arc;

use sotto_core::{Error, LlmConfig, LlmProvider, ProviderFactory, Result};

pub mod gemini;
pub mod grok;
pub mod openai;

pub use gemini::GeminiProvider;
pub use grok::GrokProvider;
pub use openai::OpenAiProvider;

// ============================================================================
// Credentials
// ============================================================================

/// API keys and base URL overrides for the direct provider tier.
///
/// Keys are optional per provider; the factory reports `Error::Config` only
/// when a provider is actually requested without its key.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub openai_api_key: Option<String>,
    pub grok_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    /// Base URL overrides, used by tests and proxies.
    pub openai_base_url: Option<String>,
    pub grok_base_url: Option<String>,
    pub gemini_base_url: Option<String>,
}

impl ProviderCredentials {
    /// Read keys from `OPENAI_API_KEY`, `GROK_API_KEY` and `GEMINI_API_KEY`,
    /// with `*_BASE_URL` overrides. Empty values count as unset.
    pub fn from_env() -> Self {
        Self {
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            grok_api_key: non_empty_env("GROK_API_KEY"),
            gemini_api_key: non_empty_env("GEMINI_API_KEY"),
            openai_base_url: non_empty_env("OPENAI_BASE_URL"),
            grok_base_url: non_empty_env("GROK_BASE_URL"),
            gemini_base_url: non_empty_env("GEMINI_BASE_URL"),
        }
    }

    pub fn with_openai_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    pub fn with_grok_key(mut self, key: impl Into<String>) -> Self {
        self.grok_api_key = Some(key.into());
        self
    }

    pub fn with_gemini_key(mut self, key: impl Into<String>) -> Self {
        self.gemini_api_key = Some(key.into());
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Factory
// ============================================================================

/// [`ProviderFactory`] backed by static credentials.
///
/// The only place in the workspace that branches on [`LlmProvider`] to pick
/// a concrete client.
pub struct CredentialProviderFactory {
    credentials: ProviderCredentials,
}

impl CredentialProviderFactory {
    pub fn new(credentials: ProviderCredentials) -> Self {
        Self { credentials }
    }

    pub fn from_env() -> Self {
        Self::new(ProviderCredentials::from_env())
    }
}

impl ProviderFactory for CredentialProviderFactory {
    fn provider_for(&self, config: &LlmConfig) -> Result<Arc<dyn sotto_core::ChatCompletionProvider>> {
        match config.provider {
            LlmProvider::OpenAi => {
                let key = require_key(&self.credentials.openai_api_key, config.provider)?;
                let mut provider = OpenAiProvider::new(key, &config.model);
                if let Some(base) = &self.credentials.openai_base_url {
                    provider = provider.with_base_url(base);
                }
                Ok(Arc::new(provider))
            }
            LlmProvider::Grok => {
                let key = require_key(&self.credentials.grok_api_key, config.provider)?;
                let mut provider = GrokProvider::new(key, &config.model);
                if let Some(base) = &self.credentials.grok_base_url {
                    provider = provider.with_base_url(base);
                }
                Ok(Arc::new(provider))
            }
            LlmProvider::Gemini => {
                let key = require_key(&self.credentials.gemini_api_key, config.provider)?;
                let mut provider = GeminiProvider::new(key, &config.model);
                if let Some(base) = &self.credentials.gemini_base_url {
                    provider = provider.with_base_url(base);
                }
                Ok(Arc::new(provider))
            }
        }
    }
}

fn require_key(key: &Option<String>, provider: LlmProvider) -> Result<String> {
    key.clone()
        .ok_or_else(|| Error::Config(format!("no API key configured for provider {provider}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_configured_provider() {
        let factory = CredentialProviderFactory::new(
            ProviderCredentials::default()
                .with_openai_key("sk-test")
                .with_gemini_key("g-test"),
        );

        let provider = factory
            .provider_for(&LlmConfig::new(LlmProvider::OpenAi))
            .unwrap();
        assert_eq!(provider.provider(), LlmProvider::OpenAi);
        assert_eq!(provider.model(), "gpt-4o-mini");

        let provider = factory
            .provider_for(&LlmConfig::new(LlmProvider::Gemini))
            .unwrap();
        assert_eq!(provider.provider(), LlmProvider::Gemini);
    }

    #[test]
    fn test_factory_missing_key_is_config_error() {
        let factory = CredentialProviderFactory::new(ProviderCredentials::default());
        let err = factory
            .provider_for(&LlmConfig::new(LlmProvider::Grok))
            .err()
            .unwrap();
        match err {
            Error::Config(msg) => assert!(msg.contains("grok"), "unexpected message: {msg}"),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_factory_respects_model_override() {
        let factory = CredentialProviderFactory::new(
            ProviderCredentials::default().with_grok_key("xai-test"),
        );
        let config = LlmConfig::with_model(LlmProvider::Grok, "grok-3").unwrap();
        let provider = factory.provider_for(&config).unwrap();
        assert_eq!(provider.model(), "grok-3");
    }
}
