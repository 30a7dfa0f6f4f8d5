//! Conversation state machine.
//!
//! The manager owns the session list and serializes mutation through
//! `&mut self`: a second send cannot start while one is in flight because
//! the borrow checker already enforces exclusive access. Sessions are kept
//! sorted newest-first by `updated_at`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use sotto_core::defaults;
use sotto_core::progress::{stage, NoopProgress, ProgressSink};
use sotto_core::{
    ChatMessage, ChatSession, ChatSessionRepository, Error, Language, LlmConfig, NoteRepository,
    Result,
};
use sotto_inference::ChatBackend;

use crate::context::{context_block, neutral_history};

// ============================================================================
// Outcome
// ============================================================================

/// What a send produced, beyond the mutated session itself.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// The appended model message (the apology when the completion failed).
    pub reply: ChatMessage,
    /// How many notes were folded into the context block.
    pub context_count: usize,
    /// The reply is an apology because generation failed.
    pub completion_failed: bool,
    /// The upsert after the send reached the server.
    pub persisted: bool,
}

// ============================================================================
// Manager
// ============================================================================

/// Owns chat sessions and drives the retrieve-generate-persist send flow.
///
/// Drafts (zero messages) live only in memory; the store never sees them.
/// Every remote failure behind a send degrades instead of erroring: retrieval
/// falls back to empty context, a failed completion becomes an apology reply,
/// and a failed upsert keeps the appended messages locally.
pub struct ChatConversationManager {
    sessions: Vec<ChatSession>,
    active_id: Option<String>,
    store: Arc<dyn ChatSessionRepository>,
    notes: Arc<dyn NoteRepository>,
    chat: Arc<dyn ChatBackend>,
    progress: Arc<dyn ProgressSink>,
}

impl ChatConversationManager {
    pub fn new(
        store: Arc<dyn ChatSessionRepository>,
        notes: Arc<dyn NoteRepository>,
        chat: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            sessions: Vec::new(),
            active_id: None,
            store,
            notes,
            chat,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Sessions, newest-first by `updated_at`.
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn active(&self) -> Option<&ChatSession> {
        let id = self.active_id.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start a fresh local-only draft and make it active.
    pub fn start_draft(&mut self) -> &ChatSession {
        let draft = ChatSession::draft();
        self.active_id = Some(draft.id.clone());
        // A draft's updated_at is "now", so newest-first puts it in front.
        self.sessions.insert(0, draft);
        &self.sessions[0]
    }

    /// Replace the local list with the server's sessions. Local drafts are
    /// kept; they exist nowhere else.
    #[instrument(skip(self), fields(subsystem = "chat", component = "sessions", op = "load"))]
    pub async fn load_sessions(&mut self) -> Result<()> {
        let mut sessions = self.store.list().await?;
        let drafts: Vec<ChatSession> = self
            .sessions
            .iter()
            .filter(|s| s.is_draft())
            .cloned()
            .collect();
        sessions.extend(drafts);
        self.sessions = sessions;
        self.sort_sessions();
        if let Some(id) = self.active_id.clone() {
            if !self.sessions.iter().any(|s| s.id == id) {
                self.active_id = None;
            }
        }
        debug!(count = self.sessions.len(), "sessions loaded");
        Ok(())
    }

    /// Resume the most recently updated server session, or start a fresh
    /// draft when none exists or the fetch fails.
    #[instrument(skip(self), fields(subsystem = "chat", component = "sessions", op = "resume"))]
    pub async fn resume_latest(&mut self) -> &ChatSession {
        match self.store.latest().await {
            Ok(Some(session)) => self.adopt(session),
            Ok(None) => self.start_draft(),
            Err(error) => {
                warn!(%error, "latest session fetch failed, starting a draft");
                self.start_draft()
            }
        }
    }

    /// Make an existing session the active one.
    pub fn select(&mut self, id: &str) -> Result<()> {
        if self.sessions.iter().any(|s| s.id == id) {
            self.active_id = Some(id.to_string());
            Ok(())
        } else {
            Err(Error::NotFound(format!("session {}", id)))
        }
    }

    /// Rename a session. The new title is kept locally even when the upsert
    /// fails; drafts are renamed without any store call.
    pub async fn rename(&mut self, id: &str, title: impl Into<String>) -> Result<()> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        session.title = title.into();
        let snapshot = session.clone();
        if !snapshot.is_draft() {
            if let Err(error) = self.store.upsert(&snapshot).await {
                warn!(%error, session_id = %id, "session rename not persisted");
            }
        }
        Ok(())
    }

    /// Delete a session locally and, for non-drafts, on the server. The
    /// local removal stands even when the server call fails. Deleting the
    /// active session selects the most recent remaining one, or a fresh
    /// draft when none remain.
    #[instrument(skip(self), fields(subsystem = "chat", component = "sessions", op = "delete"))]
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        let removed = self.sessions.remove(index);
        if !removed.is_draft() {
            if let Err(error) = self.store.delete(id).await {
                warn!(%error, session_id = %id, "session delete not persisted");
            }
        }
        if self.active_id.as_deref() == Some(id) {
            self.active_id = self.sessions.first().map(|s| s.id.clone());
            if self.active_id.is_none() {
                self.start_draft();
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Send
    // ------------------------------------------------------------------

    /// Send a user message in the active session (starting a draft when
    /// there is none) and append the generated reply.
    ///
    /// Retrieval failures degrade to empty context and completion failures
    /// degrade to a per-language apology reply; neither fails the send. The
    /// whole session is then upserted and the list resorted.
    #[instrument(skip(self, text, llm_config), fields(
        subsystem = "chat",
        component = "conversation",
        op = "send",
        provider = %llm_config.provider,
    ))]
    pub async fn send_message(
        &mut self,
        text: &str,
        llm_config: &LlmConfig,
    ) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("message is empty".to_string()));
        }
        let index = self.ensure_active();

        // The user turn is immutable once appended.
        self.sessions[index].messages.push(ChatMessage::user(text));
        let history = {
            let messages = &self.sessions[index].messages;
            neutral_history(&messages[..messages.len() - 1])
        };

        self.progress.report(stage::RETRIEVING_CONTEXT);
        let context_notes = match self.notes.search(text).await {
            Ok(mut notes) => {
                notes.truncate(defaults::CHAT_CONTEXT_NOTES);
                notes
            }
            Err(error) => {
                // The conversation never blocks on search availability.
                warn!(%error, "context retrieval failed, generating without notes");
                Vec::new()
            }
        };
        let context = context_block(&context_notes);
        debug!(context_count = context_notes.len(), "context assembled");

        self.progress.report(stage::GENERATING);
        let (reply_text, completion_failed) =
            match self.chat.chat(&context, &history, text, llm_config).await {
                Ok(reply) => (reply, false),
                Err(error) => {
                    warn!(%error, "completion failed, appending apology reply");
                    (Language::detect(text).apology().to_string(), true)
                }
            };

        let session = &mut self.sessions[index];
        let reply = ChatMessage::model(reply_text);
        session.messages.push(reply.clone());
        if session.title.is_empty() {
            session.title = session_title(text);
        }
        session.updated_at = Utc::now();

        let snapshot = session.clone();
        let persisted = match self.store.upsert(&snapshot).await {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, session_id = %snapshot.id, "session not persisted, keeping local state");
                false
            }
        };
        self.sort_sessions();

        Ok(SendOutcome {
            reply,
            context_count: context_notes.len(),
            completion_failed,
            persisted,
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Index of the active session, starting a draft when there is none.
    fn ensure_active(&mut self) -> usize {
        if let Some(id) = self.active_id.as_deref() {
            if let Some(index) = self.sessions.iter().position(|s| s.id == id) {
                return index;
            }
        }
        self.start_draft();
        0
    }

    /// Insert or replace a session, make it active, and return it.
    fn adopt(&mut self, session: ChatSession) -> &ChatSession {
        let id = session.id.clone();
        self.sessions.retain(|s| s.id != id);
        self.sessions.push(session);
        self.sort_sessions();
        self.active_id = Some(id.clone());
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .unwrap_or_default();
        &self.sessions[index]
    }

    fn sort_sessions(&mut self) {
        self.sessions
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }
}

/// Derive a session title from the first user message: the first few words,
/// hard-capped in characters with an ellipsis when cut.
fn session_title(text: &str) -> String {
    let mut title = text
        .split_whitespace()
        .take(defaults::SESSION_TITLE_MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    if title.chars().count() > defaults::SESSION_TITLE_MAX_CHARS {
        title = title
            .chars()
            .take(defaults::SESSION_TITLE_MAX_CHARS)
            .collect();
        title.push('…');
    }
    title
}
