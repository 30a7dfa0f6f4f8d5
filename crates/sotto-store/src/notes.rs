//! Remote note repository.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use sotto_core::defaults::SEARCH_TOP_K;
use sotto_core::{BackendConfig, Error, LlmConfig, Note, NoteAnalysis, NoteRepository, Result};

use crate::http::reject;
use crate::wire::{NoteWire, NotesEnvelope, RegenerateRequest, SaveNoteRequest, SearchRequest};

/// Note repository over the backend HTTP API.
pub struct RemoteNoteStore {
    client: Client,
    config: BackendConfig,
}

impl RemoteNoteStore {
    pub fn new(config: BackendConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, config }
    }

    /// Bearer credential, or an immediate `Unauthorized` without touching
    /// the network. Silent empty results are not an acceptable auth failure
    /// mode.
    fn bearer(&self) -> Result<&str> {
        self.config
            .api_token
            .as_deref()
            .ok_or_else(|| Error::Unauthorized("no API token configured".to_string()))
    }
}

#[async_trait]
impl NoteRepository for RemoteNoteStore {
    #[instrument(skip(self, note, embedding), fields(subsystem = "store", component = "notes", op = "save", note_id = %note.id))]
    async fn save(&self, note: &Note, embedding: &[f32]) -> Result<()> {
        let token = self.bearer()?;
        let request = SaveNoteRequest {
            note: NoteWire::from_domain(note),
            embedding,
        };

        let response = self
            .client
            .post(self.config.endpoint("/notes"))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Store(format!("save request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(reject("save note", response, Error::Store).await);
        }

        info!(has_audio = note.audio.is_some(), "Note saved");
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "notes", op = "list"))]
    async fn list(&self) -> Result<Vec<Note>> {
        let token = self.bearer()?;
        let start = Instant::now();

        let response = self
            .client
            .get(self.config.endpoint("/notes"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Store(format!("list request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(reject("list notes", response, Error::Store).await);
        }

        let envelope: NotesEnvelope = response
            .json()
            .await
            .map_err(|e| Error::Store(format!("failed to parse note list: {}", e)))?;

        debug!(
            result_count = envelope.notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed notes"
        );
        Ok(envelope.notes)
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "notes", op = "fetch", note_id = %id))]
    async fn fetch(&self, id: &str) -> Result<Note> {
        let token = self.bearer()?;

        let response = self
            .client
            .get(self.config.endpoint(&format!("/notes/{}", id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Store(format!("fetch request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(reject("fetch note", response, Error::Store).await);
        }

        let wire: NoteWire = response
            .json()
            .await
            .map_err(|e| Error::Store(format!("failed to parse note: {}", e)))?;
        wire.into_domain()
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "notes", op = "delete", note_id = %id))]
    async fn delete(&self, id: &str) -> Result<()> {
        let token = self.bearer()?;

        let response = self
            .client
            .delete(self.config.endpoint(&format!("/notes/{}", id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Store(format!("delete request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(reject("delete note", response, Error::Store).await);
        }

        info!("Note deleted");
        Ok(())
    }

    #[instrument(skip(self, llm_config), fields(subsystem = "store", component = "notes", op = "regenerate", note_id = %id, provider = %llm_config.provider))]
    async fn regenerate(&self, id: &str, llm_config: &LlmConfig) -> Result<NoteAnalysis> {
        let token = self.bearer()?;

        let response = self
            .client
            .post(self.config.endpoint(&format!("/notes/{}/regenerate", id)))
            .bearer_auth(token)
            .json(&RegenerateRequest { llm_config })
            .send()
            .await
            .map_err(|e| Error::Store(format!("regenerate request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(reject("regenerate note", response, Error::Store).await);
        }

        let analysis: NoteAnalysis = response
            .json()
            .await
            .map_err(|e| Error::Store(format!("failed to parse regenerated fields: {}", e)))?;

        info!("Note regenerated server-side");
        Ok(analysis)
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "notes", op = "search", query = %query))]
    async fn search(&self, query: &str) -> Result<Vec<Note>> {
        let token = self.bearer()?;
        let start = Instant::now();

        let response = self
            .client
            .post(self.config.endpoint("/notes/search"))
            .bearer_auth(token)
            .json(&SearchRequest { query })
            .send()
            .await
            .map_err(|e| Error::Search(format!("search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(reject("search notes", response, Error::Search).await);
        }

        let envelope: NotesEnvelope = response
            .json()
            .await
            .map_err(|e| Error::Search(format!("failed to parse search results: {}", e)))?;

        let mut notes = envelope.notes;
        if notes.len() > SEARCH_TOP_K {
            warn!(
                result_count = notes.len(),
                "Server returned more than the top-K contract, clamping"
            );
            notes.truncate(SEARCH_TOP_K);
        }

        debug!(
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Vector search complete"
        );
        Ok(notes)
    }
}
