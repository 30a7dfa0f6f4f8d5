//! Inference backends for sotto.
//!
//! Everything that talks to a model lives here, one concern per module:
//!
//! - [`transcription`]: upload/submit/poll client for the speech-to-text
//!   service, with an explicit [`PollPolicy`] retry budget.
//! - [`analysis`]: transcript analysis with orchestrator-first routing and
//!   direct provider fallback, plus the lenient reply parser that degrades
//!   instead of failing.
//! - [`embedding`]: remote embedding generation for vector search.
//! - [`chat`]: chat completion over note context with the same two-tier
//!   routing as analysis.
//! - [`providers`]: direct LLM provider clients (OpenAI, Grok, Gemini) behind
//!   the [`ChatCompletionProvider`](sotto_core::ChatCompletionProvider) trait.
//!
//! Backends are trait objects so callers can swap in the deterministic mocks
//! from [`mock`] (behind the `mock` feature) without touching wiring.

pub mod analysis;
pub mod chat;
pub mod embedding;
pub mod orchestrator;
pub mod providers;
pub mod transcription;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use analysis::{Analyzer, AnalysisBackend};
pub use chat::{ChatBackend, ChatResponder};
pub use embedding::RemoteEmbedder;
pub use orchestrator::OrchestratorClient;
pub use providers::{
    CredentialProviderFactory, GeminiProvider, GrokProvider, OpenAiProvider, ProviderCredentials,
};
pub use transcription::{
    PollPolicy, PollingTranscriber, TranscriberConfig, TranscriptionBackend, TranscriptionOutcome,
};
