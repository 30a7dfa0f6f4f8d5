//! Core data models for sotto.
//!
//! These types are shared across all sotto crates and represent the core
//! domain entities. Wire casing is camelCase to match the backend API; the
//! in-memory audio payload is deliberately excluded from serialization and
//! only crosses the wire through the store's boundary types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audio::AudioBlob;

// =============================================================================
// NOTE TYPES
// =============================================================================

/// Where a note's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Recorded voice note, transcribed before analysis.
    Audio,
    /// Text extracted from a PDF outside this system; skips transcription.
    Pdf,
}

/// A single knowledge-base note.
///
/// Ids are caller-generated at creation time as time-ordered UUIDv7 strings,
/// which makes every save a replace-by-id upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub transcript: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Recording length in seconds; 0 for PDF notes.
    #[serde(rename = "duration")]
    pub duration_secs: f64,
    pub source_type: SourceType,
    /// Provider that produced the analysis ("openai", "grok", "gemini").
    pub llm_provider: String,
    /// Relevance score; present only on vector search results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_score: Option<f32>,
    /// Decoded audio payload. Never serialized from the domain type: audio
    /// crosses the wire only through the store's boundary shapes, and notes
    /// deserialized from list or search responses always carry `None` here.
    #[serde(skip)]
    pub audio: Option<AudioBlob>,
}

impl Note {
    /// Generate a new time-ordered note id.
    pub fn generate_id() -> String {
        Uuid::now_v7().to_string()
    }
}

/// Structured result of analyzing a transcript.
///
/// Also the shape of a successful orchestrated analysis reply. Every field
/// defaults so that partially valid model output still deserializes; empty
/// fields are backfilled from language sentinels by the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteAnalysis {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

// =============================================================================
// CHAT TYPES
// =============================================================================

/// Author of a chat message.
///
/// `Model` follows the backend's wire vocabulary; it is remapped to the
/// neutral "assistant" role before provider APIs see the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// A single immutable chat message. Once appended to a session it is never
/// edited; corrections arrive as new messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Model, text)
    }

    fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A chat conversation over the note corpus.
///
/// `updated_at` governs list ordering (descending). A session with zero
/// messages is a draft: it exists locally and is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create an empty local-only draft session.
    pub fn draft() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            title: String::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.messages.is_empty()
    }
}
