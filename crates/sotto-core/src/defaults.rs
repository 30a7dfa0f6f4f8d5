//! Centralized default constants for sotto.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates reference these constants instead of defining their
//! own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// RECORDING VALIDATION
// =============================================================================

/// Minimum recording duration in seconds. Anything shorter is a tap, not a
/// note, and is rejected before any network call.
pub const MIN_AUDIO_DURATION_SECS: f64 = 0.1;

// =============================================================================
// TRANSCRIPTION
// =============================================================================

/// Seconds between transcription status polls. The provider queues jobs, so
/// polling faster than this only burns request quota.
pub const TRANSCRIBE_POLL_INTERVAL_SECS: u64 = 3;

/// Maximum number of status polls before giving up (~5 minutes at the
/// default interval, generous for voice notes of a few minutes).
pub const TRANSCRIBE_POLL_MAX_ATTEMPTS: u32 = 60;

/// Timeout in seconds for the audio upload request. Uploads carry the whole
/// recording body, so they get more headroom than JSON calls.
pub const TRANSCRIBE_UPLOAD_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// SEARCH
// =============================================================================

/// Quiet period in milliseconds before a typed query triggers a remote
/// vector search. Keystrokes inside this window supersede each other.
pub const SEARCH_DEBOUNCE_MS: u64 = 500;

/// Number of vector-search results kept client-side. The server already
/// ranks, this clamp is the contract ceiling.
pub const SEARCH_TOP_K: usize = 12;

/// Server-side candidate pool the top-K are ranked from. Documented here as
/// part of the search contract; the request body carries only the query.
pub const SEARCH_CANDIDATE_POOL: usize = 200;

// =============================================================================
// CHAT
// =============================================================================

/// Number of retrieved notes folded into the chat context per message.
pub const CHAT_CONTEXT_NOTES: usize = 5;

/// Maximum words taken from the first message for an auto-derived session
/// title.
pub const SESSION_TITLE_MAX_WORDS: usize = 6;

/// Maximum characters for an auto-derived session title before truncation.
pub const SESSION_TITLE_MAX_CHARS: usize = 40;

// =============================================================================
// ANALYSIS
// =============================================================================

/// Maximum characters of raw model output kept as the summary when the
/// structured reply cannot be parsed.
pub const DEGRADED_SUMMARY_MAX_CHARS: usize = 200;

/// Seconds after which an analysis round trip is logged as slow.
pub const SLOW_ANALYSIS_WARN_SECS: u64 = 30;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Embedding vector dimension produced by the backend (voyage-3).
pub const EMBED_DIMENSION: usize = 1024;

// =============================================================================
// HTTP
// =============================================================================

/// Timeout in seconds for backend JSON calls (notes, sessions, embed,
/// orchestrate, chat, health).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Timeout in seconds for direct LLM provider calls, which can stream for a
/// while before the first byte on long completions.
pub const PROVIDER_TIMEOUT_SECS: u64 = 120;
