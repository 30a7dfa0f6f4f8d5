//! Gemini provider using the `models.generateContent` REST API.
//!
//! Gemini diverges from the chat-completions dialect: the system prompt is a
//! separate `systemInstruction`, history roles are `user`/`model`, and JSON
//! mode is `generationConfig.responseMimeType`.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use async_trait::async_trait;
use sotto_core::traits::{ChatCompletionProvider, CompletionRequest, TurnRole};
use sotto_core::{defaults, Error, LlmProvider, Result};

/// Default Gemini API root.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(defaults::PROVIDER_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Model names need a `models/` prefix in the request path.
    fn model_path(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }
}

#[async_trait]
impl ChatCompletionProvider for GeminiProvider {
    #[instrument(skip(self, request), fields(
        subsystem = "inference",
        component = "provider",
        op = "complete",
        provider = "gemini",
        model = %self.model,
        json_mode = request.json_mode,
    ))]
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        let mut contents: Vec<ContentWire<'_>> = request
            .history
            .iter()
            .map(|turn| ContentWire {
                role: Some(gemini_role(turn.role)),
                parts: vec![PartWire { text: &turn.content }],
            })
            .collect();
        contents.push(ContentWire {
            role: Some("user"),
            parts: vec![PartWire {
                text: request.message,
            }],
        });

        let body = GenerateContentRequest {
            system_instruction: (!request.system.is_empty()).then(|| ContentWire {
                role: None,
                parts: vec![PartWire {
                    text: request.system,
                }],
            }),
            contents,
            generation_config: request.json_mode.then(|| GenerationConfigWire {
                response_mime_type: "application/json",
            }),
        };

        let url = format!("{}/{}:generateContent", self.base_url, self.model_path());
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(Error::Unauthorized(format!(
                    "gemini rejected API key: {body}"
                )));
            }
            return Err(Error::Completion(format!(
                "gemini returned {status}: {body}"
            )));
        }

        let body: GenerateContentResponse = response.json().await?;
        extract_reply(body)
            .ok_or_else(|| Error::Completion("gemini returned no candidates".to_string()))
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Gemini's role vocabulary has no "assistant".
fn gemini_role(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "user",
        TurnRole::Assistant => "model",
    }
}

/// Concatenated text of the first candidate's parts, if any text came back.
fn extract_reply(response: GenerateContentResponse) -> Option<String> {
    let candidate = response.candidates?.into_iter().next()?;
    let parts = candidate.content?.parts?;
    let text: String = parts.into_iter().filter_map(|part| part.text).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ContentWire<'a>>,
    contents: Vec<ContentWire<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfigWire>,
}

#[derive(Debug, Serialize)]
struct ContentWire<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<PartWire<'a>>,
}

#[derive(Debug, Serialize)]
struct PartWire<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfigWire {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<CandidateWire>>,
}

#[derive(Debug, Deserialize)]
struct CandidateWire {
    #[serde(default)]
    content: Option<CandidateContentWire>,
}

#[derive(Debug, Deserialize)]
struct CandidateContentWire {
    #[serde(default)]
    parts: Option<Vec<CandidatePartWire>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePartWire {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sotto_core::traits::ChatTurn;

    #[test]
    fn test_model_path_prefix_normalization() {
        let provider = GeminiProvider::new("key", "gemini-2.0-flash");
        assert_eq!(provider.model_path(), "models/gemini-2.0-flash");

        let provider = GeminiProvider::new("key", "models/gemini-2.5-pro");
        assert_eq!(provider.model_path(), "models/gemini-2.5-pro");
    }

    #[test]
    fn test_history_roles_map_assistant_to_model() {
        let history = vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")];
        let request = GenerateContentRequest {
            system_instruction: None,
            contents: history
                .iter()
                .map(|turn| ContentWire {
                    role: Some(gemini_role(turn.role)),
                    parts: vec![PartWire { text: &turn.content }],
                })
                .collect(),
            generation_config: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert!(json.get("systemInstruction").is_none());
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_json_mode_sets_response_mime_type() {
        let request = GenerateContentRequest {
            system_instruction: Some(ContentWire {
                role: None,
                parts: vec![PartWire { text: "extract" }],
            }),
            contents: vec![],
            generation_config: Some(GenerationConfigWire {
                response_mime_type: "application/json",
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "extract");
    }

    #[test]
    fn test_extract_reply_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"one "},{"text":"two"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_reply(response).as_deref(), Some("one two"));
    }

    #[test]
    fn test_extract_reply_handles_empty_response() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_reply(response).is_none());

        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(extract_reply(response).is_none());
    }
}
