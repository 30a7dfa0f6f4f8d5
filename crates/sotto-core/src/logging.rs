//! Structured logging schema and field name constants for sotto.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation failed and the failure surfaced to the caller |
//! | WARN  | Recoverable issue, automatic fallback or degradation applied |
//! | INFO  | Lifecycle events, completed note/session operations |
//! | DEBUG | Decision points, intermediate values, poll status updates |
//! | TRACE | Per-item iteration (search hits, context notes) |

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "store", "inference", "search", "pipeline", "chat"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "transcriber", "analyzer", "hybrid", "note_store"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create_note", "send_message", "search", "poll"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note id being operated on.
pub const NOTE_ID: &str = "note_id";

/// Chat session id being operated on.
pub const SESSION_ID: &str = "session_id";

/// Search query text.
pub const QUERY: &str = "query";

/// LLM provider name ("openai", "grok", "gemini").
pub const PROVIDER: &str = "provider";

/// Model name used for a provider call.
pub const MODEL: &str = "model";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or retrieval.
pub const RESULT_COUNT: &str = "result_count";

/// Poll attempt number within the transcription budget.
pub const ATTEMPT: &str = "attempt";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message attached to WARN/ERROR events.
pub const ERROR_MSG: &str = "error";

/// Marks an operation that exceeded its slow-warn threshold.
pub const SLOW: &str = "slow";

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT - "json" or "text" (default: "text")
///   LOG_ANSI   - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG   - standard env filter (default: debug for every sotto crate)
pub fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "sotto=debug,sotto_core=debug,sotto_store=debug,sotto_inference=debug,\
         sotto_search=debug,sotto_pipeline=debug,sotto_chat=debug"
            .into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        let mut layer = tracing_subscriber::fmt::layer();
        if let Some(ansi) = log_ansi {
            layer = layer.with_ansi(ansi);
        }
        registry.with(layer).init();
    }
}
