//! Deterministic mock backends for tests.
//!
//! Every mock records its calls into shared logs and exposes failure
//! switches, so orchestration tests can assert call counts and exercise
//! degraded paths without network or real models.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sotto_core::traits::{
    ChatCompletionProvider, ChatTurn, CompletionRequest, EmbeddingBackend, ProviderFactory,
};
use sotto_core::{Error, Language, LlmConfig, LlmProvider, NoteAnalysis, Result};

use crate::analysis::AnalysisBackend;
use crate::chat::ChatBackend;
use crate::transcription::{TranscriptionBackend, TranscriptionOutcome};

// ============================================================================
// Transcriber
// ============================================================================

/// Recorded arguments of a [`MockTranscriber::transcribe`] call.
#[derive(Debug, Clone)]
pub struct TranscribeCall {
    pub audio_bytes: usize,
    pub language_hint: Option<String>,
}

/// In-memory [`TranscriptionBackend`].
///
/// Outcomes queued with [`with_outcomes`](Self::with_outcomes) are consumed
/// in order; once the queue is empty the base outcome repeats.
#[derive(Clone)]
pub struct MockTranscriber {
    base: TranscriptionOutcome,
    queue: Arc<Mutex<VecDeque<TranscriptionOutcome>>>,
    calls: Arc<Mutex<Vec<TranscribeCall>>>,
    latency_ms: u64,
    fail: bool,
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self {
            base: TranscriptionOutcome {
                transcript: "mock transcript".to_string(),
                detected_language: Some("en".to_string()),
            },
            queue: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            latency_ms: 0,
            fail: false,
        }
    }
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.base.transcript = transcript.into();
        self
    }

    pub fn with_detected_language(mut self, code: impl Into<String>) -> Self {
        self.base.detected_language = Some(code.into());
        self
    }

    /// Queue one outcome per expected call, for tests where consecutive
    /// transcriptions must differ (e.g. regeneration).
    pub fn with_outcomes(self, outcomes: Vec<TranscriptionOutcome>) -> Self {
        *self.queue.lock().unwrap() = outcomes.into();
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Simulated latency per call, for tests exercising in-flight state.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn calls(&self) -> Vec<TranscribeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TranscriptionBackend for MockTranscriber {
    async fn transcribe(
        &self,
        audio: &sotto_core::AudioBlob,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionOutcome> {
        self.calls.lock().unwrap().push(TranscribeCall {
            audio_bytes: audio.bytes.len(),
            language_hint: language_hint.map(str::to_string),
        });

        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }

        if self.fail {
            return Err(Error::Transcription(
                "simulated transcription failure".to_string(),
            ));
        }

        let queued = self.queue.lock().unwrap().pop_front();
        Ok(queued.unwrap_or_else(|| self.base.clone()))
    }
}

// ============================================================================
// Analyzer
// ============================================================================

/// Recorded arguments of a [`MockAnalyzer::analyze`] call.
#[derive(Debug, Clone)]
pub struct AnalyzeCall {
    pub transcript: String,
    pub provider: LlmProvider,
    pub model: String,
    pub language: Language,
}

/// In-memory [`AnalysisBackend`]. Without a canned analysis it echoes the
/// input transcript with mock display fields.
#[derive(Clone, Default)]
pub struct MockAnalyzer {
    analysis: Option<NoteAnalysis>,
    calls: Arc<Mutex<Vec<AnalyzeCall>>>,
    fail: bool,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analysis(mut self, analysis: NoteAnalysis) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<AnalyzeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AnalysisBackend for MockAnalyzer {
    async fn analyze(
        &self,
        transcript: &str,
        llm_config: &LlmConfig,
        language: Language,
    ) -> Result<NoteAnalysis> {
        self.calls.lock().unwrap().push(AnalyzeCall {
            transcript: transcript.to_string(),
            provider: llm_config.provider,
            model: llm_config.model.clone(),
            language,
        });

        if self.fail {
            return Err(Error::Analysis("simulated analysis failure".to_string()));
        }

        let mut analysis = self.analysis.clone().unwrap_or_else(|| NoteAnalysis {
            summary: "Mock summary.".to_string(),
            title: "Mock title".to_string(),
            tags: vec!["mock".to_string()],
            ..NoteAnalysis::default()
        });
        // A canned analysis without a transcript echoes the input.
        if analysis.transcript.is_empty() {
            analysis.transcript = transcript.to_string();
        }
        Ok(analysis)
    }
}

// ============================================================================
// Embedder
// ============================================================================

/// In-memory [`EmbeddingBackend`] producing deterministic vectors.
///
/// Vectors are derived from character codes, so equal text always embeds
/// identically and different text (almost) always differs. Vectors are
/// unit-normalized.
#[derive(Clone)]
pub struct MockEmbedder {
    dimension: usize,
    calls: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self {
            dimension: 8,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// The vector [`embed`](EmbeddingBackend::embed) would return for `text`.
    pub fn vector_for(text: &str, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0f32; dimension];
        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % dimension;
            vec[idx] += 0.1;
        }
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
        vec
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Embedding("simulated embedding failure".to_string()));
        }
        Ok(Self::vector_for(text, self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Chat backend
// ============================================================================

/// Recorded arguments of a [`MockChatBackend::chat`] call.
#[derive(Debug, Clone)]
pub struct ChatCall {
    pub context: String,
    pub history: Vec<ChatTurn>,
    pub message: String,
    pub provider: LlmProvider,
}

/// In-memory [`ChatBackend`] with a canned reply.
#[derive(Clone)]
pub struct MockChatBackend {
    reply: String,
    calls: Arc<Mutex<Vec<ChatCall>>>,
    fail: bool,
}

impl Default for MockChatBackend {
    fn default() -> Self {
        Self {
            reply: "mock chat reply".to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<ChatCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn chat(
        &self,
        context: &str,
        history: &[ChatTurn],
        message: &str,
        llm_config: &LlmConfig,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(ChatCall {
            context: context.to_string(),
            history: history.to_vec(),
            message: message.to_string(),
            provider: llm_config.provider,
        });
        if self.fail {
            return Err(Error::Completion(
                "simulated completion failure".to_string(),
            ));
        }
        Ok(self.reply.clone())
    }
}

// ============================================================================
// Chat completion provider
// ============================================================================

/// Recorded arguments of a [`MockChatProvider::complete`] call.
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub system: String,
    pub history_len: usize,
    pub message: String,
    pub json_mode: bool,
}

/// In-memory [`ChatCompletionProvider`] with a canned reply.
pub struct MockChatProvider {
    reply: String,
    provider: LlmProvider,
    model: String,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
    fail: bool,
}

impl Default for MockChatProvider {
    fn default() -> Self {
        Self {
            reply: "mock provider reply".to_string(),
            provider: LlmProvider::OpenAi,
            model: LlmProvider::OpenAi.default_model().to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }
}

impl MockChatProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    pub fn with_provider(mut self, provider: LlmProvider) -> Self {
        self.provider = provider;
        self.model = provider.default_model().to_string();
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<ProviderCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatCompletionProvider for MockChatProvider {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        self.calls.lock().unwrap().push(ProviderCall {
            system: request.system.to_string(),
            history_len: request.history.len(),
            message: request.message.to_string(),
            json_mode: request.json_mode,
        });
        if self.fail {
            return Err(Error::Completion(
                "simulated provider failure".to_string(),
            ));
        }
        Ok(self.reply.clone())
    }

    fn provider(&self) -> LlmProvider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// [`ProviderFactory`] handing out one shared [`MockChatProvider`].
///
/// Keep a clone of the inner `Arc` to assert on the provider's call log
/// after the factory has been moved into the system under test.
#[derive(Clone)]
pub struct MockProviderFactory {
    provider: Arc<MockChatProvider>,
    missing_credentials: bool,
}

impl Default for MockProviderFactory {
    fn default() -> Self {
        Self {
            provider: Arc::new(MockChatProvider::default()),
            missing_credentials: false,
        }
    }
}

impl MockProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(provider: Arc<MockChatProvider>) -> Self {
        Self {
            provider,
            missing_credentials: false,
        }
    }

    /// Simulate absent API keys: every lookup fails with `Error::Config`.
    pub fn without_credentials(mut self) -> Self {
        self.missing_credentials = true;
        self
    }

    pub fn provider_call_count(&self) -> usize {
        self.provider.call_count()
    }
}

impl ProviderFactory for MockProviderFactory {
    fn provider_for(&self, config: &LlmConfig) -> Result<Arc<dyn ChatCompletionProvider>> {
        if self.missing_credentials {
            return Err(Error::Config(format!(
                "no API key configured for provider {}",
                config.provider
            )));
        }
        Ok(self.provider.clone())
    }
}
