//! Progress reporting seam.
//!
//! Long-running flows (note creation, transcription polling, chat sends)
//! emit coarse stage strings so a frontend can surface "Transcribing..."
//! style status without the engine knowing anything about rendering.

/// Receives stage transitions from long-running operations.
///
/// Implementations must be cheap and non-blocking; the engine calls this
/// inline between stages.
pub trait ProgressSink: Send + Sync {
    fn report(&self, stage: &str);
}

/// No-op sink for when progress isn't surfaced.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _stage: &str) {}
}

/// Stage names emitted by the engine. Shared constants so frontends can
/// match on them without string drift.
pub mod stage {
    pub const VALIDATING: &str = "validating";
    pub const UPLOADING: &str = "uploading";
    pub const QUEUED: &str = "queued";
    pub const PROCESSING: &str = "processing";
    pub const TRANSCRIBING: &str = "transcribing";
    pub const ANALYZING: &str = "analyzing";
    pub const EMBEDDING: &str = "embedding";
    pub const SAVING: &str = "saving";
    pub const RETRIEVING_CONTEXT: &str = "retrieving-context";
    pub const GENERATING: &str = "generating";
}
