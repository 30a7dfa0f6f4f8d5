//! Conversation manager tests against the in-memory stores and chat mock.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use sotto_chat::ChatConversationManager;
use sotto_core::progress::stage;
use sotto_core::{
    ChatMessage, ChatRole, ChatSession, Error, Language, LlmConfig, Note, ProgressSink,
    SourceType, TurnRole,
};
use sotto_inference::mock::MockChatBackend;
use sotto_store::mock::{MemoryNoteStore, MemorySessionStore, SessionCall, StoreCall};

#[derive(Clone, Default)]
struct RecordingProgress {
    stages: Arc<Mutex<Vec<String>>>,
}

impl RecordingProgress {
    fn stages(&self) -> Vec<String> {
        self.stages.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, stage: &str) {
        self.stages.lock().unwrap().push(stage.to_string());
    }
}

struct Fixture {
    sessions: MemorySessionStore,
    notes: MemoryNoteStore,
    chat: MockChatBackend,
}

impl Fixture {
    fn new() -> Self {
        Self {
            sessions: MemorySessionStore::default(),
            notes: MemoryNoteStore::default(),
            chat: MockChatBackend::new(),
        }
    }

    fn manager(&self) -> ChatConversationManager {
        ChatConversationManager::new(
            Arc::new(self.sessions.clone()),
            Arc::new(self.notes.clone()),
            Arc::new(self.chat.clone()),
        )
    }
}

fn session(id: &str, title: &str, minutes_ago: i64) -> ChatSession {
    let when = Utc::now() - Duration::minutes(minutes_ago);
    ChatSession {
        id: id.to_string(),
        title: title.to_string(),
        messages: vec![ChatMessage::user("seed")],
        created_at: when,
        updated_at: when,
    }
}

fn note(title: &str) -> Note {
    Note {
        id: Note::generate_id(),
        title: title.to_string(),
        summary: format!("summary of {}", title),
        transcript: format!("transcript of {}", title),
        tags: Vec::new(),
        created_at: Utc::now(),
        duration_secs: 2.0,
        source_type: SourceType::Audio,
        llm_provider: "openai".to_string(),
        vector_score: Some(0.8),
        audio: None,
    }
}

// ============================================================================
// Send flow
// ============================================================================

#[tokio::test]
async fn test_send_appends_user_and_model_turns() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();

    let outcome = manager
        .send_message("hello there", &LlmConfig::default())
        .await
        .unwrap();

    assert_eq!(outcome.reply.text, "mock chat reply");
    assert!(!outcome.completion_failed);
    assert!(outcome.persisted);
    assert_eq!(outcome.context_count, 0);

    let active = manager.active().unwrap();
    assert_eq!(active.messages.len(), 2);
    assert_eq!(active.messages[0].role, ChatRole::User);
    assert_eq!(active.messages[0].text, "hello there");
    assert_eq!(active.messages[1].role, ChatRole::Model);

    assert_eq!(fixture.sessions.upsert_count(), 1);
    let stored = fixture.sessions.stored_session(&active.id).unwrap();
    assert_eq!(stored.messages.len(), 2);
}

#[tokio::test]
async fn test_first_message_titles_session_once() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();

    manager
        .send_message(
            "What did I say about the quarterly report",
            &LlmConfig::default(),
        )
        .await
        .unwrap();
    assert_eq!(manager.active().unwrap().title, "What did I say about the");

    manager
        .send_message("And what about the budget", &LlmConfig::default())
        .await
        .unwrap();
    assert_eq!(
        manager.active().unwrap().title,
        "What did I say about the",
        "title is set once, on the first message"
    );
}

#[tokio::test]
async fn test_context_uses_top_five_notes() {
    let mut fixture = Fixture::new();
    let corpus: Vec<Note> = (1..=12).map(|i| note(&format!("alpha-{:02}", i))).collect();
    fixture.notes = MemoryNoteStore::default().with_search_results(corpus);
    let mut manager = fixture.manager();

    let outcome = manager
        .send_message("alpha?", &LlmConfig::default())
        .await
        .unwrap();

    assert_eq!(outcome.context_count, 5);
    let call = fixture.chat.last_call().unwrap();
    assert!(call.context.contains("Title: alpha-05"));
    assert!(!call.context.contains("alpha-06"));
    assert_eq!(
        fixture.notes.calls(),
        vec![StoreCall::Search {
            query: "alpha?".to_string()
        }]
    );
}

#[tokio::test]
async fn test_retrieval_failure_generates_without_context() {
    let mut fixture = Fixture::new();
    fixture.notes = MemoryNoteStore::default().with_failing_search();
    let mut manager = fixture.manager();

    let outcome = manager
        .send_message("what about milk", &LlmConfig::default())
        .await
        .unwrap();

    assert_eq!(outcome.context_count, 0);
    assert!(!outcome.completion_failed);
    let call = fixture.chat.last_call().unwrap();
    assert_eq!(call.context, "");
}

#[tokio::test]
async fn test_completion_failure_appends_apology() {
    let mut fixture = Fixture::new();
    fixture.chat = MockChatBackend::new().with_failure();
    let mut manager = fixture.manager();

    let outcome = manager
        .send_message("summarize my notes", &LlmConfig::default())
        .await
        .unwrap();

    assert!(outcome.completion_failed);
    assert_eq!(outcome.reply.role, ChatRole::Model);
    assert_eq!(outcome.reply.text, Language::English.apology());
    // The conversation is never left hanging after the user turn.
    assert_eq!(manager.active().unwrap().messages.len(), 2);
    assert!(outcome.persisted);
}

#[tokio::test]
async fn test_completion_failure_apologizes_in_chinese() {
    let mut fixture = Fixture::new();
    fixture.chat = MockChatBackend::new().with_failure();
    let mut manager = fixture.manager();

    let outcome = manager
        .send_message("帮我总结一下最近的笔记", &LlmConfig::default())
        .await
        .unwrap();

    assert_eq!(outcome.reply.text, Language::Chinese.apology());
}

#[tokio::test]
async fn test_upsert_failure_keeps_local_messages() {
    let mut fixture = Fixture::new();
    fixture.sessions = MemorySessionStore::default().with_failing_upsert();
    let mut manager = fixture.manager();

    let outcome = manager
        .send_message("remember this", &LlmConfig::default())
        .await
        .unwrap();

    assert!(!outcome.persisted);
    assert_eq!(manager.active().unwrap().messages.len(), 2);
}

#[tokio::test]
async fn test_history_maps_model_role_to_assistant() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();

    manager
        .send_message("first", &LlmConfig::default())
        .await
        .unwrap();
    manager
        .send_message("second", &LlmConfig::default())
        .await
        .unwrap();

    let call = fixture.chat.last_call().unwrap();
    assert_eq!(call.message, "second");
    assert_eq!(call.history.len(), 2);
    assert_eq!(call.history[0].role, TurnRole::User);
    assert_eq!(call.history[0].content, "first");
    assert_eq!(call.history[1].role, TurnRole::Assistant);
    assert_eq!(call.history[1].content, "mock chat reply");
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();

    let err = manager
        .send_message("   ", &LlmConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(fixture.chat.call_count(), 0);
    assert_eq!(fixture.sessions.upsert_count(), 0);
}

#[tokio::test]
async fn test_send_reports_retrieval_and_generation_stages() {
    let fixture = Fixture::new();
    let progress = RecordingProgress::default();
    let mut manager = fixture.manager().with_progress(Arc::new(progress.clone()));

    manager
        .send_message("hello", &LlmConfig::default())
        .await
        .unwrap();

    assert_eq!(
        progress.stages(),
        vec![stage::RETRIEVING_CONTEXT, stage::GENERATING]
    );
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn test_fresh_draft_is_never_persisted() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();

    let draft = manager.start_draft();
    assert!(draft.is_draft());
    assert!(draft.title.is_empty());

    assert_eq!(manager.sessions().len(), 1);
    assert_eq!(fixture.sessions.upsert_count(), 0);
}

#[tokio::test]
async fn test_sessions_resort_after_send() {
    let fixture = Fixture::new();
    let store = MemorySessionStore::default()
        .with_session(session("a", "Older", 60))
        .with_session(session("b", "Newer", 30));
    let mut manager = ChatConversationManager::new(
        Arc::new(store),
        Arc::new(fixture.notes.clone()),
        Arc::new(fixture.chat.clone()),
    );

    manager.load_sessions().await.unwrap();
    let ids: Vec<&str> = manager.sessions().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);

    manager.select("a").unwrap();
    manager
        .send_message("bump", &LlmConfig::default())
        .await
        .unwrap();

    let ids: Vec<&str> = manager.sessions().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"], "appending moves the session up front");
}

#[tokio::test]
async fn test_load_sessions_keeps_local_draft() {
    let fixture = Fixture::new();
    let store = MemorySessionStore::default().with_session(session("a", "Server", 60));
    let mut manager = ChatConversationManager::new(
        Arc::new(store),
        Arc::new(fixture.notes.clone()),
        Arc::new(fixture.chat.clone()),
    );

    let draft_id = manager.start_draft().id.clone();
    manager.load_sessions().await.unwrap();

    assert_eq!(manager.sessions().len(), 2);
    assert_eq!(manager.sessions()[0].id, draft_id, "draft is newest");
    assert_eq!(manager.active_id(), Some(draft_id.as_str()));
}

#[tokio::test]
async fn test_delete_active_falls_back_to_most_recent() {
    let sessions = MemorySessionStore::default()
        .with_session(session("a", "Older", 60))
        .with_session(session("b", "Newer", 30));
    let fixture = Fixture::new();
    let mut manager = ChatConversationManager::new(
        Arc::new(sessions.clone()),
        Arc::new(fixture.notes.clone()),
        Arc::new(fixture.chat.clone()),
    );

    manager.load_sessions().await.unwrap();
    manager.select("b").unwrap();

    manager.delete("b").await.unwrap();
    assert_eq!(manager.active_id(), Some("a"));
    assert!(sessions.calls().contains(&SessionCall::Delete {
        id: "b".to_string()
    }));

    manager.delete("a").await.unwrap();
    let active = manager.active().unwrap();
    assert!(active.is_draft(), "no sessions left, fresh draft selected");
}

#[tokio::test]
async fn test_delete_draft_skips_store() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();

    let draft_id = manager.start_draft().id.clone();
    manager.delete(&draft_id).await.unwrap();

    let deletes = fixture
        .sessions
        .calls()
        .iter()
        .filter(|c| matches!(c, SessionCall::Delete { .. }))
        .count();
    assert_eq!(deletes, 0, "drafts never reach the store");
    assert!(manager.active().unwrap().is_draft());
}

#[tokio::test]
async fn test_delete_failure_keeps_local_removal() {
    let sessions = MemorySessionStore::default()
        .with_session(session("a", "Only", 10))
        .with_failing_delete();
    let fixture = Fixture::new();
    let mut manager = ChatConversationManager::new(
        Arc::new(sessions),
        Arc::new(fixture.notes.clone()),
        Arc::new(fixture.chat.clone()),
    );

    manager.load_sessions().await.unwrap();
    manager.delete("a").await.unwrap();

    assert!(manager.sessions().iter().all(|s| s.id != "a"));
}

#[tokio::test]
async fn test_resume_latest_adopts_server_session() {
    let fixture = Fixture::new();
    let store = MemorySessionStore::default()
        .with_session(session("a", "Older", 60))
        .with_session(session("b", "Newer", 30));
    let mut manager = ChatConversationManager::new(
        Arc::new(store),
        Arc::new(fixture.notes.clone()),
        Arc::new(fixture.chat.clone()),
    );

    let resumed_id = manager.resume_latest().await.id.clone();
    assert_eq!(resumed_id, "b");
    assert_eq!(manager.active_id(), Some("b"));
}

#[tokio::test]
async fn test_resume_latest_falls_back_to_draft() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();

    let resumed = manager.resume_latest().await;
    assert!(resumed.is_draft());
}

#[tokio::test]
async fn test_select_unknown_session_is_not_found() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();

    let err = manager.select("ghost").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_rename_persists_non_draft() {
    let sessions = MemorySessionStore::default().with_session(session("a", "Old name", 10));
    let fixture = Fixture::new();
    let mut manager = ChatConversationManager::new(
        Arc::new(sessions.clone()),
        Arc::new(fixture.notes.clone()),
        Arc::new(fixture.chat.clone()),
    );

    manager.load_sessions().await.unwrap();
    manager.rename("a", "New name").await.unwrap();

    assert_eq!(manager.sessions()[0].title, "New name");
    assert_eq!(sessions.stored_session("a").unwrap().title, "New name");
}
