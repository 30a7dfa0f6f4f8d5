//! Wiremock tests for the two-tier analysis/chat routing and the embedder.
//!
//! One mock server plays both the backend (orchestrator, embed) and the
//! direct provider APIs, so fallback ordering is asserted with `expect`
//! counts on the provider routes.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sotto_core::traits::EmbeddingBackend;
use sotto_core::{BackendConfig, Error, Language, LlmConfig, LlmProvider};
use sotto_inference::{
    AnalysisBackend, Analyzer, ChatBackend, ChatResponder, CredentialProviderFactory,
    OrchestratorClient, ProviderCredentials, RemoteEmbedder,
};

fn orchestrator_for(server: &MockServer) -> OrchestratorClient {
    OrchestratorClient::new(BackendConfig::new(server.uri()).with_token("test-token"))
}

fn openai_factory(server: &MockServer) -> Arc<CredentialProviderFactory> {
    let mut credentials = ProviderCredentials::default().with_openai_key("sk-test");
    credentials.openai_base_url = Some(format!("{}/v1", server.uri()));
    Arc::new(CredentialProviderFactory::new(credentials))
}

fn gemini_factory(server: &MockServer) -> Arc<CredentialProviderFactory> {
    let mut credentials = ProviderCredentials::default().with_gemini_key("g-test");
    credentials.gemini_base_url = Some(server.uri());
    Arc::new(CredentialProviderFactory::new(credentials))
}

// ============================================================================
// Analysis routing
// ============================================================================

#[tokio::test]
async fn test_orchestrated_analysis_skips_direct_provider() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "transcript": "buy milk",
            "llmConfig": { "provider": "openai", "model": "gpt-4o-mini" },
            "language": "en"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"transcript":"buy milk","summary":"A shopping reminder.","title":"Milk","tags":["shopping"]}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let analyzer = Analyzer::new(orchestrator_for(&server), openai_factory(&server));
    let analysis = analyzer
        .analyze("buy milk", &LlmConfig::default(), Language::English)
        .await
        .unwrap();

    assert_eq!(analysis.title, "Milk");
    assert_eq!(analysis.tags, vec!["shopping"]);
}

#[tokio::test]
async fn test_orchestrator_failure_falls_back_to_provider_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("router down"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant",
                "content": "{\"summary\":\"Fallback summary.\",\"title\":\"Fallback\",\"tags\":[\"x\"]}" } } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let analyzer = Analyzer::new(orchestrator_for(&server), openai_factory(&server));
    let analysis = analyzer
        .analyze("buy milk", &LlmConfig::default(), Language::English)
        .await
        .unwrap();

    assert_eq!(analysis.title, "Fallback");
    // Missing transcript in the reply backfills from the input.
    assert_eq!(analysis.transcript, "buy milk");
}

#[tokio::test]
async fn test_fallback_garbage_reply_degrades_instead_of_failing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": "no json here, sorry" } } ]
        })))
        .mount(&server)
        .await;

    let analyzer = Analyzer::new(orchestrator_for(&server), openai_factory(&server));
    let analysis = analyzer
        .analyze("buy milk", &LlmConfig::default(), Language::English)
        .await
        .unwrap();

    assert_eq!(analysis.title, "Voice note");
    assert_eq!(analysis.tags, vec!["voice", "note"]);
    assert_eq!(analysis.transcript, "buy milk");
    assert_eq!(analysis.summary, "no json here, sorry");
}

#[tokio::test]
async fn test_gemini_fallback_routes_through_generate_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .and(header("x-goog-api-key", "g-test"))
        .and(body_partial_json(json!({
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [ { "content": { "parts": [
                { "text": "{\"summary\":\"Via Gemini.\",\"title\":\"G\",\"tags\":[\"g\"]}" }
            ] } } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let analyzer = Analyzer::new(orchestrator_for(&server), gemini_factory(&server));
    let analysis = analyzer
        .analyze(
            "buy milk",
            &LlmConfig::new(LlmProvider::Gemini),
            Language::English,
        )
        .await
        .unwrap();

    assert_eq!(analysis.title, "G");
}

#[tokio::test]
async fn test_both_tiers_failing_is_analysis_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream gone"))
        .expect(1)
        .mount(&server)
        .await;

    let analyzer = Analyzer::new(orchestrator_for(&server), openai_factory(&server));
    let err = analyzer
        .analyze("buy milk", &LlmConfig::default(), Language::English)
        .await
        .unwrap_err();

    match err {
        Error::Analysis(msg) => assert!(msg.contains("openai"), "unexpected message: {msg}"),
        other => panic!("expected Analysis error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fallback_without_credentials_is_config_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let factory = Arc::new(CredentialProviderFactory::new(ProviderCredentials::default()));
    let analyzer = Analyzer::new(orchestrator_for(&server), factory);
    let err = analyzer
        .analyze("buy milk", &LlmConfig::default(), Language::English)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
}

// ============================================================================
// Chat routing
// ============================================================================

#[tokio::test]
async fn test_orchestrated_chat_happy_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "context": "- Milk note",
            "history": [ { "role": "user", "content": "hi" } ],
            "message": "what about milk?",
            "llmConfig": { "provider": "openai" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "You planned to buy milk."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let responder = ChatResponder::new(orchestrator_for(&server), openai_factory(&server));
    let history = vec![sotto_core::traits::ChatTurn::user("hi")];
    let reply = responder
        .chat(
            "- Milk note",
            &history,
            "what about milk?",
            &LlmConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(reply, "You planned to buy milk.");
}

#[tokio::test]
async fn test_chat_falls_back_with_context_in_system_prompt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [ { "role": "system" }, { "role": "user", "content": "what about milk?" } ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": "Milk it is." } } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let responder = ChatResponder::new(orchestrator_for(&server), openai_factory(&server));
    let reply = responder
        .chat("- Milk note", &[], "what about milk?", &LlmConfig::default())
        .await
        .unwrap();

    assert_eq!(reply, "Milk it is.");

    // The fallback folds the note context into the system prompt.
    let requests = server.received_requests().await.unwrap();
    let completion = requests
        .iter()
        .find(|r| r.url.path() == "/v1/chat/completions")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&completion.body).unwrap();
    let system = body["messages"][0]["content"].as_str().unwrap();
    assert!(system.contains("- Milk note"), "system prompt: {system}");
}

#[tokio::test]
async fn test_chat_both_tiers_failing_is_completion_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let responder = ChatResponder::new(orchestrator_for(&server), openai_factory(&server));
    let err = responder
        .chat("", &[], "hello?", &LlmConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Completion(_)));
}

// ============================================================================
// Embedding
// ============================================================================

#[tokio::test]
async fn test_embed_happy_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({ "text": "buy milk" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": [0.1, 0.2, 0.3]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = RemoteEmbedder::new(BackendConfig::new(server.uri()).with_token("test-token"));
    let vector = embedder.embed("buy milk").await.unwrap();
    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn test_empty_embedding_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": [] })))
        .mount(&server)
        .await;

    let embedder = RemoteEmbedder::new(BackendConfig::new(server.uri()).with_token("test-token"));
    let err = embedder.embed("buy milk").await.unwrap_err();

    match err {
        Error::Embedding(msg) => assert!(msg.contains("empty"), "unexpected message: {msg}"),
        other => panic!("expected Embedding error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_embed_without_token_fails_fast() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let embedder = RemoteEmbedder::new(BackendConfig::new(server.uri()));
    let err = embedder.embed("buy milk").await.unwrap_err();

    assert!(matches!(err, Error::Unauthorized(_)));
}
