//! Client for the backend's managed inference routes.
//!
//! The backend owns the prompt templates and provider keys for these routes;
//! the client just ships the inputs and hands back the model output. When
//! these routes are down, [`Analyzer`](crate::Analyzer) and
//! [`ChatResponder`](crate::ChatResponder) fall back to calling a provider
//! directly with the caller's own credentials.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use sotto_core::traits::ChatTurn;
use sotto_core::{defaults, BackendConfig, Error, Language, LlmConfig, Result};

/// HTTP client for `POST /orchestrate` and `POST /chat`.
#[derive(Clone)]
pub struct OrchestratorClient {
    client: Client,
    config: BackendConfig,
}

impl OrchestratorClient {
    pub fn new(config: BackendConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(defaults::PROVIDER_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, config }
    }

    fn bearer(&self) -> Result<&str> {
        self.config
            .api_token
            .as_deref()
            .ok_or_else(|| Error::Unauthorized("no API token configured".to_string()))
    }

    /// Run server-side transcript analysis, returning the raw reply body.
    ///
    /// The backend may pass model output through verbatim, so the body is not
    /// assumed to be JSON here; parsing belongs to the analysis layer.
    #[instrument(skip(self, transcript), fields(
        subsystem = "inference",
        component = "orchestrator",
        op = "orchestrate",
        provider = %llm_config.provider,
        model = %llm_config.model,
    ))]
    pub async fn orchestrate(
        &self,
        transcript: &str,
        llm_config: &LlmConfig,
        language: Language,
    ) -> Result<String> {
        let token = self.bearer()?;
        let response = self
            .client
            .post(self.config.endpoint("/orchestrate"))
            .bearer_auth(token)
            .json(&OrchestrateRequest {
                transcript,
                llm_config,
                language,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(reject("orchestrate", response, Error::Analysis).await);
        }

        let body = response.text().await?;
        debug!(reply_chars = body.chars().count(), "Orchestrated analysis reply");
        Ok(body)
    }

    /// Run a server-side chat completion over note context.
    #[instrument(skip(self, context, history, message), fields(
        subsystem = "inference",
        component = "orchestrator",
        op = "chat",
        provider = %llm_config.provider,
        model = %llm_config.model,
        history_len = history.len(),
    ))]
    pub async fn chat(
        &self,
        context: &str,
        history: &[ChatTurn],
        message: &str,
        llm_config: &LlmConfig,
    ) -> Result<String> {
        let token = self.bearer()?;
        let history: Vec<HistoryTurn<'_>> = history.iter().map(HistoryTurn::from).collect();
        let response = self
            .client
            .post(self.config.endpoint("/chat"))
            .bearer_auth(token)
            .json(&ChatRequest {
                context,
                history: &history,
                message,
                llm_config,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(reject("chat", response, Error::Completion).await);
        }

        let body: ChatResponse = response.json().await?;
        Ok(body.response)
    }
}

async fn reject(op: &str, response: reqwest::Response, wrap: fn(String) -> Error) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        Error::Unauthorized(format!("{op} rejected: {body}"))
    } else {
        wrap(format!("{op} returned {status}: {body}"))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct OrchestrateRequest<'a> {
    transcript: &'a str,
    #[serde(rename = "llmConfig")]
    llm_config: &'a LlmConfig,
    language: Language,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    context: &'a str,
    history: &'a [HistoryTurn<'a>],
    message: &'a str,
    #[serde(rename = "llmConfig")]
    llm_config: &'a LlmConfig,
}

#[derive(Debug, Serialize)]
struct HistoryTurn<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> From<&'a ChatTurn> for HistoryTurn<'a> {
    fn from(turn: &'a ChatTurn) -> Self {
        Self {
            role: turn.role.as_str(),
            content: &turn.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sotto_core::LlmProvider;

    #[test]
    fn test_orchestrate_request_serialization() {
        let llm_config = LlmConfig::new(LlmProvider::Gemini);
        let request = OrchestrateRequest {
            transcript: "buy milk tomorrow",
            llm_config: &llm_config,
            language: Language::English,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["transcript"], "buy milk tomorrow");
        assert_eq!(json["llmConfig"]["provider"], "gemini");
        assert_eq!(json["llmConfig"]["model"], "gemini-2.0-flash");
        assert_eq!(json["language"], "en");
    }

    #[test]
    fn test_chat_request_history_roles() {
        let history = vec![
            ChatTurn::user("what did I say about milk?"),
            ChatTurn::assistant("you planned to buy some"),
        ];
        let wire: Vec<HistoryTurn<'_>> = history.iter().map(HistoryTurn::from).collect();
        let llm_config = LlmConfig::default();
        let request = ChatRequest {
            context: "",
            history: &wire,
            message: "when?",
            llm_config: &llm_config,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["history"][0]["role"], "user");
        assert_eq!(json["history"][1]["role"], "assistant");
    }
}
