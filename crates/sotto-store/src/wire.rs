//! Wire shapes private to the store.
//!
//! The backend speaks camelCase JSON. Domain types already serialize that
//! way; these extra shapes exist for the payloads the domain types refuse to
//! express, chiefly audio as `audioData` + `audioMimeType`, and the request
//! envelopes.

use serde::{Deserialize, Serialize};

use sotto_core::audio::{decode_audio, encode_audio};
use sotto_core::{ChatSession, LlmConfig, Note, Result, SourceType};

/// Full note as stored by the backend, audio included.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NoteWire {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub transcript: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "duration")]
    pub duration_secs: f64,
    pub source_type: SourceType,
    pub llm_provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_mime_type: Option<String>,
}

impl NoteWire {
    /// Encode a domain note for transport. The only call site of
    /// `encode_audio` in the workspace.
    pub fn from_domain(note: &Note) -> Self {
        let (audio_data, audio_mime_type) = match &note.audio {
            Some(blob) => {
                let (data, mime) = encode_audio(blob);
                (Some(data), Some(mime))
            }
            None => (None, None),
        };
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            summary: note.summary.clone(),
            transcript: note.transcript.clone(),
            tags: note.tags.clone(),
            created_at: note.created_at,
            duration_secs: note.duration_secs,
            source_type: note.source_type,
            llm_provider: note.llm_provider.clone(),
            vector_score: note.vector_score,
            audio_data,
            audio_mime_type,
        }
    }

    /// Decode a fetched note, rehydrating the audio payload when both wire
    /// fields are present.
    pub fn into_domain(self) -> Result<Note> {
        let audio = match (&self.audio_data, &self.audio_mime_type) {
            (Some(data), Some(mime)) => Some(decode_audio(data, mime)?),
            _ => None,
        };
        Ok(Note {
            id: self.id,
            title: self.title,
            summary: self.summary,
            transcript: self.transcript,
            tags: self.tags,
            created_at: self.created_at,
            duration_secs: self.duration_secs,
            source_type: self.source_type,
            llm_provider: self.llm_provider,
            vector_score: self.vector_score,
            audio,
        })
    }
}

/// Body of `POST /notes`.
#[derive(Serialize)]
pub(crate) struct SaveNoteRequest<'a> {
    pub note: NoteWire,
    pub embedding: &'a [f32],
}

/// Body of `POST /notes/:id/regenerate`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegenerateRequest<'a> {
    pub llm_config: &'a LlmConfig,
}

/// Body of `POST /notes/search`.
#[derive(Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub query: &'a str,
}

/// Collection envelope for note lists and search results.
#[derive(Deserialize)]
pub(crate) struct NotesEnvelope {
    pub notes: Vec<Note>,
}

/// Collection envelope for session lists.
#[derive(Deserialize)]
pub(crate) struct SessionsEnvelope {
    pub sessions: Vec<ChatSession>,
}
