//! Transcript analysis with orchestrator-first routing.
//!
//! Routing has two tiers: the backend's `/orchestrate` route, then one
//! direct provider call built from the caller's own credentials. Reply
//! parsing sits behind both tiers and is deliberately lenient: a reply that
//! cannot be parsed degrades into a synthesized analysis instead of failing
//! the pipeline, because by this point the audio has already been
//! transcribed and the user's words must not be lost.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use tracing::{info, instrument, warn};

use sotto_core::traits::{CompletionRequest, ProviderFactory};
use sotto_core::{defaults, Error, Language, LlmConfig, NoteAnalysis, Result};

use crate::orchestrator::OrchestratorClient;

// ============================================================================
// Trait
// ============================================================================

/// Backend producing structured analysis for a transcript.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Analyze `transcript`, writing title/summary/tags in `language`.
    async fn analyze(
        &self,
        transcript: &str,
        llm_config: &LlmConfig,
        language: Language,
    ) -> Result<NoteAnalysis>;
}

// ============================================================================
// Analyzer
// ============================================================================

/// Two-tier analysis backend: orchestrator first, direct provider fallback.
pub struct Analyzer {
    orchestrator: OrchestratorClient,
    factory: Arc<dyn ProviderFactory>,
}

impl Analyzer {
    pub fn new(orchestrator: OrchestratorClient, factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            orchestrator,
            factory,
        }
    }

    /// Single direct-provider attempt. Not retried: if this fails too, the
    /// whole analysis fails.
    async fn direct_analysis(
        &self,
        transcript: &str,
        llm_config: &LlmConfig,
        language: Language,
    ) -> Result<String> {
        let provider = self.factory.provider_for(llm_config)?;
        let system = analysis_prompt(language);
        let request = CompletionRequest::single(&system, transcript).with_json_mode();
        provider.complete(request).await.map_err(|e| {
            Error::Analysis(format!(
                "direct {} analysis failed after orchestrator fallback: {e}",
                llm_config.provider
            ))
        })
    }
}

#[async_trait]
impl AnalysisBackend for Analyzer {
    #[instrument(skip(self, transcript), fields(
        subsystem = "inference",
        component = "analyzer",
        op = "analyze",
        provider = %llm_config.provider,
        model = %llm_config.model,
        language = language.code(),
        transcript_chars = transcript.chars().count(),
    ))]
    async fn analyze(
        &self,
        transcript: &str,
        llm_config: &LlmConfig,
        language: Language,
    ) -> Result<NoteAnalysis> {
        let start = Instant::now();
        let raw = match self
            .orchestrator
            .orchestrate(transcript, llm_config, language)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error_msg = %e, "Orchestrated analysis unavailable, falling back to direct provider");
                self.direct_analysis(transcript, llm_config, language)
                    .await?
            }
        };

        let analysis = parse_reply(&raw, transcript, language);

        let elapsed = start.elapsed();
        if elapsed.as_secs() >= defaults::SLOW_ANALYSIS_WARN_SECS {
            warn!(
                duration_ms = elapsed.as_millis() as u64,
                slow = true,
                "Analysis complete"
            );
        } else {
            info!(duration_ms = elapsed.as_millis() as u64, "Analysis complete");
        }
        Ok(analysis)
    }
}

// ============================================================================
// Reply parsing
// ============================================================================

/// Parse a model reply into a [`NoteAnalysis`]. Never fails.
///
/// Strategy: strip Markdown code fences, pull out the outermost JSON object,
/// deserialize leniently (all fields default), then backfill anything still
/// empty from the language sentinels. A reply with no usable JSON degrades
/// via [`degraded`].
pub fn parse_reply(raw: &str, transcript: &str, language: Language) -> NoteAnalysis {
    match parse_strict(raw) {
        Some(mut analysis) => {
            backfill(&mut analysis, transcript, language);
            analysis
        }
        None => {
            warn!(
                subsystem = "inference",
                component = "analyzer",
                reply_chars = raw.chars().count(),
                "Analysis reply is not parseable JSON, degrading"
            );
            degraded(raw, transcript, language)
        }
    }
}

/// Synthesized analysis for a reply that is not parseable JSON. The raw
/// reply is kept (truncated) as the summary so the model's output is not
/// discarded entirely.
pub fn degraded(raw: &str, transcript: &str, language: Language) -> NoteAnalysis {
    let trimmed = raw.trim();
    let summary = if trimmed.is_empty() {
        language.fallback_summary().to_string()
    } else {
        truncate_chars(trimmed, defaults::DEGRADED_SUMMARY_MAX_CHARS)
    };
    NoteAnalysis {
        transcript: transcript.to_string(),
        summary,
        title: language.fallback_title().to_string(),
        tags: language.default_tags(),
    }
}

fn parse_strict(raw: &str) -> Option<NoteAnalysis> {
    let stripped = strip_code_fences(raw);
    let candidate = extract_json_object(stripped)?;
    serde_json::from_str(candidate).ok()
}

/// Strip a wrapping Markdown code fence (with optional info string) if the
/// reply carries one.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    match rest.strip_suffix("```") {
        Some(inner) => inner.trim(),
        // Unterminated fence: leave the reply as-is for the extractor.
        None => trimmed,
    }
}

/// First `{` through last `}`, spanning newlines.
fn extract_json_object(text: &str) -> Option<&str> {
    let pattern = Regex::new(r"(?s)\{.*\}").unwrap();
    pattern.find(text).map(|m| m.as_str())
}

fn backfill(analysis: &mut NoteAnalysis, transcript: &str, language: Language) {
    if analysis.transcript.trim().is_empty() {
        analysis.transcript = transcript.to_string();
    }
    if analysis.title.trim().is_empty() {
        analysis.title = language.fallback_title().to_string();
    }
    if analysis.summary.trim().is_empty() {
        analysis.summary = language.fallback_summary().to_string();
    }
    if analysis.tags.is_empty() {
        analysis.tags = language.default_tags();
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(max).collect();
        truncated.push('…');
        truncated
    }
}

/// System prompt for the direct-provider extraction call. The orchestrator
/// owns its own prompts server-side; this one only exists for the fallback
/// tier.
fn analysis_prompt(language: Language) -> String {
    let language_line = match language {
        Language::English => "Write the title, summary and tags in English.",
        Language::Chinese => "Write the title, summary and tags in Chinese.",
    };
    format!(
        "You analyze voice note transcripts. Reply with a single JSON object \
         with exactly these fields: \"transcript\" (the transcript, cleaned of \
         filler words), \"summary\" (2-3 sentences), \"title\" (a few words), \
         \"tags\" (3-5 short lowercase strings). Reply with JSON only, no \
         prose and no code fences. {language_line}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = "remember to water the plants";

    #[test]
    fn test_parse_clean_json_reply() {
        let raw = r#"{"transcript":"water the plants","summary":"A reminder.","title":"Plants","tags":["home"]}"#;
        let analysis = parse_reply(raw, TRANSCRIPT, Language::English);
        assert_eq!(analysis.transcript, "water the plants");
        assert_eq!(analysis.title, "Plants");
        assert_eq!(analysis.tags, vec!["home"]);
    }

    #[test]
    fn test_parse_fenced_reply() {
        let raw = "```json\n{\"summary\":\"Fenced.\",\"title\":\"T\",\"tags\":[\"a\"]}\n```";
        let analysis = parse_reply(raw, TRANSCRIPT, Language::English);
        assert_eq!(analysis.summary, "Fenced.");
        // Missing transcript backfills from the original.
        assert_eq!(analysis.transcript, TRANSCRIPT);
    }

    #[test]
    fn test_parse_reply_with_surrounding_prose() {
        let raw = "Here is the analysis you asked for:\n{\"title\":\"Found it\"}\nHope that helps!";
        let analysis = parse_reply(raw, TRANSCRIPT, Language::English);
        assert_eq!(analysis.title, "Found it");
    }

    #[test]
    fn test_garbage_reply_degrades_with_sentinels() {
        let raw = "I'm sorry, I can't produce JSON today.";
        let analysis = parse_reply(raw, TRANSCRIPT, Language::English);
        assert_eq!(analysis.title, "Voice note");
        assert_eq!(analysis.tags, vec!["voice", "note"]);
        assert_eq!(analysis.transcript, TRANSCRIPT);
        assert_eq!(analysis.summary, raw);
    }

    #[test]
    fn test_degraded_chinese_sentinels() {
        let analysis = parse_reply("не JSON", "浇花", Language::Chinese);
        assert_eq!(analysis.title, "语音笔记");
        assert_eq!(analysis.tags, vec!["语音", "笔记"]);
        assert_eq!(analysis.transcript, "浇花");
    }

    #[test]
    fn test_empty_reply_uses_fallback_summary() {
        let analysis = parse_reply("", TRANSCRIPT, Language::English);
        assert_eq!(analysis.summary, "(no summary)");
        assert_eq!(analysis.transcript, TRANSCRIPT);
    }

    #[test]
    fn test_degraded_summary_truncates_long_replies() {
        let raw = "x".repeat(500);
        let analysis = parse_reply(&raw, TRANSCRIPT, Language::English);
        assert_eq!(
            analysis.summary.chars().count(),
            defaults::DEGRADED_SUMMARY_MAX_CHARS + 1
        );
        assert!(analysis.summary.ends_with('…'));
    }

    #[test]
    fn test_truncation_is_char_boundary_safe() {
        let raw: String = "语".repeat(300);
        let analysis = parse_reply(&raw, "某转录", Language::Chinese);
        assert!(analysis.summary.starts_with('语'));
        assert_eq!(
            analysis.summary.chars().count(),
            defaults::DEGRADED_SUMMARY_MAX_CHARS + 1
        );
    }

    #[test]
    fn test_backfill_partial_json() {
        let raw = r#"{"summary":"Only a summary."}"#;
        let analysis = parse_reply(raw, TRANSCRIPT, Language::English);
        assert_eq!(analysis.summary, "Only a summary.");
        assert_eq!(analysis.title, "Voice note");
        assert_eq!(analysis.tags, vec!["voice", "note"]);
        assert_eq!(analysis.transcript, TRANSCRIPT);
    }

    #[test]
    fn test_strip_code_fences_variants() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
        // Unterminated fence falls through untouched.
        assert_eq!(strip_code_fences("```json\n{}"), "```json\n{}");
    }

    #[test]
    fn test_extract_json_object_spans_newlines() {
        let text = "noise {\n \"a\": 1\n} trailing";
        assert_eq!(extract_json_object(text), Some("{\n \"a\": 1\n}"));
        assert_eq!(extract_json_object("no braces here"), None);
    }

    #[test]
    fn test_analysis_prompt_carries_language_instruction() {
        assert!(analysis_prompt(Language::English).contains("in English"));
        assert!(analysis_prompt(Language::Chinese).contains("in Chinese"));
    }
}
