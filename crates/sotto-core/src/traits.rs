//! Core traits for sotto abstractions.
//!
//! These traits define the seams between the orchestration crates and the
//! remote services: the store implements the repositories over HTTP, the
//! inference crate implements the backends, and mocks implement everything
//! for tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::{LlmConfig, LlmProvider};
use crate::models::{ChatSession, Note, NoteAnalysis};

// =============================================================================
// NOTE REPOSITORY
// =============================================================================

/// Repository for note persistence and retrieval.
///
/// Ids are caller-generated and stable, so `save` is a replace-by-id upsert:
/// creating and updating a note are the same operation.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Persist a note and its embedding (create or replace-by-id).
    async fn save(&self, note: &Note, embedding: &[f32]) -> Result<()>;

    /// List all notes, newest first. Audio payloads are never included.
    async fn list(&self) -> Result<Vec<Note>>;

    /// Fetch a single note with its audio payload decoded.
    async fn fetch(&self, id: &str) -> Result<Note>;

    /// Delete a note.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Ask the server to re-run analysis for a stored note. The server
    /// recomputes and stores a fresh embedding as part of this call; the
    /// response carries only the updated display fields.
    async fn regenerate(&self, id: &str, llm_config: &LlmConfig) -> Result<NoteAnalysis>;

    /// Vector search over the note corpus. Results carry `vector_score` and
    /// no audio.
    async fn search(&self, query: &str) -> Result<Vec<Note>>;
}

// =============================================================================
// CHAT SESSION REPOSITORY
// =============================================================================

/// Repository for chat session persistence.
#[async_trait]
pub trait ChatSessionRepository: Send + Sync {
    /// Persist the full session (replace-by-id). Draft sessions (zero
    /// messages) are skipped without a network call.
    async fn upsert(&self, session: &ChatSession) -> Result<()>;

    /// List all persisted sessions.
    async fn list(&self) -> Result<Vec<ChatSession>>;

    /// The most recently updated session, if any exist.
    async fn latest(&self) -> Result<Option<ChatSession>>;

    /// Delete a session.
    async fn delete(&self, id: &str) -> Result<()>;
}

// =============================================================================
// INFERENCE BACKENDS
// =============================================================================

/// Backend for generating text embeddings.
///
/// Embedding failures are always hard failures: callers never fabricate a
/// zero vector or skip the step silently.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate the embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Expected dimension of produced vectors.
    fn dimension(&self) -> usize;
}

/// Neutral author role for provider-facing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    /// Wire name in the OpenAI-compatible vocabulary.
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

/// One prior exchange in provider-neutral form. The domain's `model` role is
/// remapped to `Assistant` before providers see it; the Gemini impl maps it
/// back to its own "model" vocabulary internally.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// A single completion request against a provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    /// System instruction (persona, task framing, retrieved context).
    pub system: &'a str,
    /// Prior conversation turns, oldest first.
    pub history: &'a [ChatTurn],
    /// The new user message.
    pub message: &'a str,
    /// Ask the provider for a JSON object reply (structured extraction).
    pub json_mode: bool,
}

impl<'a> CompletionRequest<'a> {
    /// Single-turn request with no history.
    pub fn single(system: &'a str, message: &'a str) -> Self {
        Self {
            system,
            history: &[],
            message,
            json_mode: false,
        }
    }

    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Strategy interface over the divergent provider APIs. One implementation
/// per provider; everything downstream holds `Arc<dyn ChatCompletionProvider>`
/// and never branches on the provider enum itself.
#[async_trait]
pub trait ChatCompletionProvider: Send + Sync {
    /// Run one completion and return the reply text.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String>;

    /// Which provider this implementation talks to.
    fn provider(&self) -> LlmProvider;

    /// Model name requests are issued against.
    fn model(&self) -> &str;
}

/// Builds the concrete provider for a configuration. The factory is the only
/// place that branches on the provider enum.
pub trait ProviderFactory: Send + Sync {
    /// Provider for the given config, or `Error::Config` when the required
    /// credential is absent.
    fn provider_for(&self, config: &LlmConfig) -> Result<Arc<dyn ChatCompletionProvider>>;
}
