//! Grok (x.ai) chat completions provider.
//!
//! x.ai exposes an OpenAI-compatible surface, so this client reuses the
//! chat-completions wire plumbing from [`openai`](super::openai) against its
//! own API root.

use reqwest::Client;
use tracing::instrument;

use async_trait::async_trait;
use sotto_core::traits::{ChatCompletionProvider, CompletionRequest};
use sotto_core::{LlmProvider, Result};

use super::openai::{provider_client, request_chat_completion};

/// Default x.ai API root.
pub const GROK_BASE_URL: &str = "https://api.x.ai/v1";

pub struct GrokProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GrokProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: provider_client(),
            api_key: api_key.into(),
            base_url: GROK_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ChatCompletionProvider for GrokProvider {
    #[instrument(skip(self, request), fields(
        subsystem = "inference",
        component = "provider",
        op = "complete",
        provider = "grok",
        model = %self.model,
        json_mode = request.json_mode,
    ))]
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        request_chat_completion(
            &self.client,
            &self.base_url,
            &self.api_key,
            "grok",
            &self.model,
            &request,
        )
        .await
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Grok
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url_is_xai() {
        let provider = GrokProvider::new("xai-test", "grok-3-mini");
        assert_eq!(provider.base_url, GROK_BASE_URL);
        assert_eq!(provider.model(), "grok-3-mini");
        assert_eq!(provider.provider(), LlmProvider::Grok);
    }
}
