//! Chat over the note corpus.
//!
//! A conversation is a [`ChatSession`](sotto_core::ChatSession) whose history
//! grows append-only. Each send retrieves the most relevant notes as context,
//! generates a reply through [`ChatBackend`](sotto_inference::ChatBackend),
//! and persists the full session as one replace-by-id upsert. Retrieval and
//! persistence failures degrade (log, continue); only invalid input is an
//! error the caller sees.

pub mod context;
pub mod manager;

pub use context::{context_block, neutral_history};
pub use manager::{ChatConversationManager, SendOutcome};
