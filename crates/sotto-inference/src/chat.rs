//! Chat completion over note context.
//!
//! Mirrors the analysis routing: the backend's `/chat` route first (it holds
//! the chat prompt templates), then one direct provider call with the
//! retrieved note context folded into a locally built system prompt.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use sotto_core::traits::{ChatTurn, CompletionRequest, ProviderFactory};
use sotto_core::{Error, LlmConfig, Result};

use crate::orchestrator::OrchestratorClient;

/// Backend answering a chat message grounded in retrieved notes.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Answer `message` given `context` (formatted note excerpts) and the
    /// prior `history`, oldest turn first.
    async fn chat(
        &self,
        context: &str,
        history: &[ChatTurn],
        message: &str,
        llm_config: &LlmConfig,
    ) -> Result<String>;
}

/// Two-tier chat backend: orchestrator first, direct provider fallback.
pub struct ChatResponder {
    orchestrator: OrchestratorClient,
    factory: Arc<dyn ProviderFactory>,
}

impl ChatResponder {
    pub fn new(orchestrator: OrchestratorClient, factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            orchestrator,
            factory,
        }
    }

    async fn direct_chat(
        &self,
        context: &str,
        history: &[ChatTurn],
        message: &str,
        llm_config: &LlmConfig,
    ) -> Result<String> {
        let provider = self.factory.provider_for(llm_config)?;
        let system = chat_prompt(context);
        let request = CompletionRequest {
            system: &system,
            history,
            message,
            json_mode: false,
        };
        provider.complete(request).await.map_err(|e| {
            Error::Completion(format!(
                "direct {} chat failed after orchestrator fallback: {e}",
                llm_config.provider
            ))
        })
    }
}

#[async_trait]
impl ChatBackend for ChatResponder {
    #[instrument(skip(self, context, history, message), fields(
        subsystem = "inference",
        component = "chat",
        op = "chat",
        provider = %llm_config.provider,
        model = %llm_config.model,
        history_len = history.len(),
        context_chars = context.chars().count(),
    ))]
    async fn chat(
        &self,
        context: &str,
        history: &[ChatTurn],
        message: &str,
        llm_config: &LlmConfig,
    ) -> Result<String> {
        match self
            .orchestrator
            .chat(context, history, message, llm_config)
            .await
        {
            Ok(reply) => {
                info!(reply_chars = reply.chars().count(), "Chat reply received");
                Ok(reply)
            }
            Err(e) => {
                warn!(error_msg = %e, "Orchestrated chat unavailable, falling back to direct provider");
                let reply = self
                    .direct_chat(context, history, message, llm_config)
                    .await?;
                info!(
                    reply_chars = reply.chars().count(),
                    "Chat reply received via fallback"
                );
                Ok(reply)
            }
        }
    }
}

/// System prompt for the direct-provider chat call, with the retrieved note
/// context inlined.
fn chat_prompt(context: &str) -> String {
    if context.trim().is_empty() {
        return "You are a helpful assistant answering questions about the user's \
                voice notes. No notes matched this question; say so when the \
                answer would need them, and answer from the conversation \
                otherwise. Answer in the language the user writes in."
            .to_string();
    }
    format!(
        "You are a helpful assistant answering questions about the user's voice \
         notes. Ground your answers in the notes below and say when they do not \
         contain the answer. Answer in the language the user writes in.\n\n\
         Relevant notes:\n{context}"
    )
}
