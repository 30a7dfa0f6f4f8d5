//! In-memory stores for deterministic testing.
//!
//! Mirror the remote stores' observable behavior (audio stripping on list,
//! draft skipping, not-found mapping) while recording every call so tests
//! can assert call-count invariants like "validation failures make zero
//! store calls".

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sotto_core::{
    ChatSession, ChatSessionRepository, Error, LlmConfig, Note, NoteAnalysis, NoteRepository,
    Result,
};

// =============================================================================
// NOTE STORE
// =============================================================================

/// One recorded note-store call.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Save { id: String },
    List,
    Fetch { id: String },
    Delete { id: String },
    Regenerate { id: String },
    Search { query: String },
}

/// In-memory note repository with a call log.
#[derive(Clone, Default)]
pub struct MemoryNoteStore {
    notes: Arc<Mutex<Vec<Note>>>,
    embeddings: Arc<Mutex<HashMap<String, Vec<f32>>>>,
    search_results: Arc<Mutex<Vec<Note>>>,
    regenerated: Arc<Mutex<Option<NoteAnalysis>>>,
    call_log: Arc<Mutex<Vec<StoreCall>>>,
    fail_save: bool,
    fail_search: bool,
    fail_delete: bool,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored note with its embedding.
    pub fn with_note(self, note: Note, embedding: Vec<f32>) -> Self {
        self.embeddings
            .lock()
            .unwrap()
            .insert(note.id.clone(), embedding);
        self.notes.lock().unwrap().push(note);
        self
    }

    /// Canned results for `search`.
    pub fn with_search_results(self, notes: Vec<Note>) -> Self {
        *self.search_results.lock().unwrap() = notes;
        self
    }

    /// Canned reply for server-side `regenerate`.
    pub fn with_regenerated(self, analysis: NoteAnalysis) -> Self {
        *self.regenerated.lock().unwrap() = Some(analysis);
        self
    }

    pub fn with_failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }

    pub fn with_failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn with_failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    pub fn save_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Save { .. }))
    }

    pub fn search_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Search { .. }))
    }

    /// Stored note by id, audio included.
    pub fn stored_note(&self, id: &str) -> Option<Note> {
        self.notes.lock().unwrap().iter().find(|n| n.id == id).cloned()
    }

    /// Embedding last saved for a note id.
    pub fn stored_embedding(&self, id: &str) -> Option<Vec<f32>> {
        self.embeddings.lock().unwrap().get(id).cloned()
    }

    fn count(&self, pred: impl Fn(&StoreCall) -> bool) -> usize {
        self.call_log.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn log(&self, call: StoreCall) {
        self.call_log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteStore {
    async fn save(&self, note: &Note, embedding: &[f32]) -> Result<()> {
        self.log(StoreCall::Save {
            id: note.id.clone(),
        });
        if self.fail_save {
            return Err(Error::Store("simulated save failure".to_string()));
        }

        let mut notes = self.notes.lock().unwrap();
        match notes.iter_mut().find(|n| n.id == note.id) {
            Some(existing) => *existing = note.clone(),
            None => notes.push(note.clone()),
        }
        self.embeddings
            .lock()
            .unwrap()
            .insert(note.id.clone(), embedding.to_vec());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Note>> {
        self.log(StoreCall::List);
        // List responses never carry audio or scores.
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(|mut n| {
                n.audio = None;
                n.vector_score = None;
                n
            })
            .collect())
    }

    async fn fetch(&self, id: &str) -> Result<Note> {
        self.log(StoreCall::Fetch { id: id.to_string() });
        self.stored_note(id)
            .ok_or_else(|| Error::NotFound(format!("note {}", id)))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.log(StoreCall::Delete { id: id.to_string() });
        if self.fail_delete {
            return Err(Error::Store("simulated delete failure".to_string()));
        }
        let mut notes = self.notes.lock().unwrap();
        let before = notes.len();
        notes.retain(|n| n.id != id);
        if notes.len() == before {
            return Err(Error::NotFound(format!("note {}", id)));
        }
        Ok(())
    }

    async fn regenerate(&self, id: &str, llm_config: &LlmConfig) -> Result<NoteAnalysis> {
        self.log(StoreCall::Regenerate { id: id.to_string() });
        let analysis = self
            .regenerated
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_default();

        let mut notes = self.notes.lock().unwrap();
        let note = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| Error::NotFound(format!("note {}", id)))?;
        note.title = analysis.title.clone();
        note.summary = analysis.summary.clone();
        note.transcript = analysis.transcript.clone();
        note.tags = analysis.tags.clone();
        note.llm_provider = llm_config.provider.to_string();
        Ok(analysis)
    }

    async fn search(&self, query: &str) -> Result<Vec<Note>> {
        self.log(StoreCall::Search {
            query: query.to_string(),
        });
        if self.fail_search {
            return Err(Error::Search("simulated search failure".to_string()));
        }
        Ok(self.search_results.lock().unwrap().clone())
    }
}

// =============================================================================
// SESSION STORE
// =============================================================================

/// One recorded session-store call.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    Upsert { id: String },
    List,
    Latest,
    Delete { id: String },
}

/// In-memory chat session repository with a call log.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<Vec<ChatSession>>>,
    call_log: Arc<Mutex<Vec<SessionCall>>>,
    fail_upsert: bool,
    fail_delete: bool,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, session: ChatSession) -> Self {
        self.sessions.lock().unwrap().push(session);
        self
    }

    pub fn with_failing_upsert(mut self) -> Self {
        self.fail_upsert = true;
        self
    }

    pub fn with_failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn upsert_count(&self) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, SessionCall::Upsert { .. }))
            .count()
    }

    pub fn stored_session(&self, id: &str) -> Option<ChatSession> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    fn log(&self, call: SessionCall) {
        self.call_log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatSessionRepository for MemorySessionStore {
    async fn upsert(&self, session: &ChatSession) -> Result<()> {
        self.log(SessionCall::Upsert {
            id: session.id.clone(),
        });
        if session.is_draft() {
            return Ok(());
        }
        if self.fail_upsert {
            return Err(Error::Store("simulated upsert failure".to_string()));
        }
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ChatSession>> {
        self.log(SessionCall::List);
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn latest(&self) -> Result<Option<ChatSession>> {
        self.log(SessionCall::Latest);
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .max_by_key(|s| s.updated_at)
            .cloned())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.log(SessionCall::Delete { id: id.to_string() });
        if self.fail_delete {
            return Err(Error::Store("simulated delete failure".to_string()));
        }
        self.sessions.lock().unwrap().retain(|s| s.id != id);
        Ok(())
    }
}
