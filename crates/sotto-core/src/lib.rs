//! # sotto-core
//!
//! Core types, traits, and abstractions for the sotto voice-note engine.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other sotto crates depend on: the note and chat session models, the
//! LLM provider configuration, the audio codec boundary, and the repository
//! and backend traits implemented by the store and inference crates.

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod language;
pub mod llm;
pub mod logging;
pub mod models;
pub mod progress;
pub mod traits;

// Re-export commonly used types at crate root
pub use audio::{decode_audio, encode_audio, AudioBlob};
pub use config::BackendConfig;
pub use error::{Error, Result};
pub use language::Language;
pub use llm::{LlmConfig, LlmProvider};
pub use models::{ChatMessage, ChatRole, ChatSession, Note, NoteAnalysis, SourceType};
pub use progress::{NoopProgress, ProgressSink};
pub use traits::*;
