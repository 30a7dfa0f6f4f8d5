//! Recording-to-note pipeline for sotto.
//!
//! [`NotePipeline`] strings the backends together: transcribe, analyze,
//! embed, persist. It owns the ordering rules (validate before any network
//! call, embed the original transcript, treat a failed save as degraded
//! rather than fatal) and the per-note regeneration guard.

pub mod pipeline;

pub use pipeline::{DocumentInput, NewRecording, NotePipeline, PipelineOutcome};
