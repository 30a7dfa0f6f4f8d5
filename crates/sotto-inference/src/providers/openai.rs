//! OpenAI chat completions provider.
//!
//! Also home to the shared chat-completions wire types and request helper;
//! Grok speaks the same protocol and reuses them.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use async_trait::async_trait;
use sotto_core::traits::{ChatCompletionProvider, CompletionRequest};
use sotto_core::{defaults, Error, LlmProvider, Result};

/// Default OpenAI API root.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for `POST {base}/chat/completions`.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: provider_client(),
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ChatCompletionProvider for OpenAiProvider {
    #[instrument(skip(self, request), fields(
        subsystem = "inference",
        component = "provider",
        op = "complete",
        provider = "openai",
        model = %self.model,
        json_mode = request.json_mode,
    ))]
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        request_chat_completion(
            &self.client,
            &self.base_url,
            &self.api_key,
            "openai",
            &self.model,
            &request,
        )
        .await
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Shared chat-completions plumbing (OpenAI and Grok)
// ============================================================================

pub(crate) fn provider_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(defaults::PROVIDER_TIMEOUT_SECS))
        .build()
        .expect("Failed to create HTTP client")
}

/// Issue one chat-completions request and extract the reply text.
pub(crate) async fn request_chat_completion(
    client: &Client,
    base_url: &str,
    api_key: &str,
    provider_label: &str,
    model: &str,
    request: &CompletionRequest<'_>,
) -> Result<String> {
    let body = ChatCompletionsRequest {
        model,
        messages: completion_messages(request),
        response_format: request.json_mode.then(ResponseFormat::json_object),
    };

    let response = client
        .post(format!("{base_url}/chat/completions"))
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized(format!(
                "{provider_label} rejected API key: {body}"
            )));
        }
        return Err(Error::Completion(format!(
            "{provider_label} returned {status}: {body}"
        )));
    }

    let body: ChatCompletionsResponse = response.json().await?;
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Completion(format!("{provider_label} returned no choices")))?;
    Ok(choice.message.content)
}

/// Flatten a [`CompletionRequest`] into the `messages` array.
fn completion_messages<'a>(request: &'a CompletionRequest<'_>) -> Vec<MessageWire<'a>> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    if !request.system.is_empty() {
        messages.push(MessageWire {
            role: "system",
            content: request.system,
        });
    }
    for turn in request.history {
        messages.push(MessageWire {
            role: turn.role.as_str(),
            content: &turn.content,
        });
    }
    messages.push(MessageWire {
        role: "user",
        content: request.message,
    });
    messages
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<MessageWire<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct MessageWire<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

impl ResponseFormat {
    fn json_object() -> Self {
        Self {
            format_type: "json_object",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<ChoiceWire>,
}

#[derive(Debug, Deserialize)]
struct ChoiceWire {
    message: ChoiceMessageWire,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessageWire {
    content: String,
}
