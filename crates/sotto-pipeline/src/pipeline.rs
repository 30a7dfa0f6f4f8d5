//! The note creation and regeneration pipeline.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{info, instrument, warn};

use sotto_core::progress::stage;
use sotto_core::traits::{EmbeddingBackend, NoteRepository};
use sotto_core::{
    defaults, AudioBlob, Error, Language, LlmConfig, Note, NoopProgress, ProgressSink, Result,
    SourceType,
};
use sotto_inference::analysis::AnalysisBackend;
use sotto_inference::transcription::{TranscriptionBackend, TranscriptionOutcome};

// ============================================================================
// Inputs and outcome
// ============================================================================

/// A finished recording handed to the pipeline.
#[derive(Debug, Clone)]
pub struct NewRecording {
    pub audio: AudioBlob,
    pub duration_secs: f64,
    /// Optional language hint forwarded to the transcription service.
    pub language_hint: Option<String>,
}

/// Pre-extracted document text (PDF import path).
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub text: String,
    /// Usually the file name; replaces only a sentinel title, never a
    /// model-produced one.
    pub title_hint: Option<String>,
}

/// What the pipeline produced.
///
/// `persisted: false` means the save failed but the note is still complete
/// and usable locally; callers decide whether to retry the save.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub note: Note,
    pub persisted: bool,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Orchestrates transcription, analysis, embedding and persistence.
pub struct NotePipeline {
    transcriber: Arc<dyn TranscriptionBackend>,
    analyzer: Arc<dyn AnalysisBackend>,
    embedder: Arc<dyn EmbeddingBackend>,
    store: Arc<dyn NoteRepository>,
    progress: Arc<dyn ProgressSink>,
    /// Note ids with a regeneration currently running.
    in_flight: Mutex<HashSet<String>>,
}

impl NotePipeline {
    pub fn new(
        transcriber: Arc<dyn TranscriptionBackend>,
        analyzer: Arc<dyn AnalysisBackend>,
        embedder: Arc<dyn EmbeddingBackend>,
        store: Arc<dyn NoteRepository>,
    ) -> Self {
        Self {
            transcriber,
            analyzer,
            embedder,
            store,
            progress: Arc::new(NoopProgress),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Turn a recording into an analyzed, embedded, persisted note.
    #[instrument(skip(self, recording), fields(
        subsystem = "pipeline",
        component = "notes",
        op = "create",
        duration_secs = recording.duration_secs,
        provider = %llm_config.provider,
    ))]
    pub async fn create_note(
        &self,
        recording: NewRecording,
        llm_config: &LlmConfig,
    ) -> Result<PipelineOutcome> {
        self.progress.report(stage::VALIDATING);
        if recording.audio.is_empty() {
            return Err(Error::InvalidInput("recording has no audio data".to_string()));
        }
        if recording.duration_secs < defaults::MIN_AUDIO_DURATION_SECS {
            return Err(Error::InvalidInput(format!(
                "recording too short: {:.2}s",
                recording.duration_secs
            )));
        }

        self.progress.report(stage::TRANSCRIBING);
        let transcription = self
            .transcriber
            .transcribe(&recording.audio, recording.language_hint.as_deref())
            .await?;
        let language = language_of(&transcription);

        let (analysis, embedding) = self
            .analyze_and_embed(&transcription.transcript, llm_config, language)
            .await?;

        self.progress.report(stage::SAVING);
        let note = Note {
            id: Note::generate_id(),
            title: analysis.title,
            summary: analysis.summary,
            transcript: prefer_transcript(analysis.transcript, transcription.transcript),
            tags: analysis.tags,
            created_at: Utc::now(),
            duration_secs: recording.duration_secs,
            source_type: SourceType::Audio,
            llm_provider: llm_config.provider.to_string(),
            vector_score: None,
            audio: Some(recording.audio),
        };
        let persisted = self.persist(&note, &embedding).await;
        Ok(PipelineOutcome { note, persisted })
    }

    /// Create a note from already-extracted document text. No transcription;
    /// the language is detected from the text itself.
    #[instrument(skip(self, document), fields(
        subsystem = "pipeline",
        component = "notes",
        op = "create_from_text",
        provider = %llm_config.provider,
    ))]
    pub async fn create_note_from_text(
        &self,
        document: DocumentInput,
        llm_config: &LlmConfig,
    ) -> Result<PipelineOutcome> {
        self.progress.report(stage::VALIDATING);
        let text = document.text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("document has no text".to_string()));
        }

        let language = Language::detect(text);
        let (analysis, embedding) = self.analyze_and_embed(text, llm_config, language).await?;

        self.progress.report(stage::SAVING);
        let mut title = analysis.title;
        if let Some(hint) = document.title_hint {
            if title.is_empty() || title == language.fallback_title() {
                title = hint;
            }
        }
        let note = Note {
            id: Note::generate_id(),
            title,
            summary: analysis.summary,
            transcript: prefer_transcript(analysis.transcript, text.to_string()),
            tags: analysis.tags,
            created_at: Utc::now(),
            duration_secs: 0.0,
            source_type: SourceType::Pdf,
            llm_provider: llm_config.provider.to_string(),
            vector_score: None,
            audio: None,
        };
        let persisted = self.persist(&note, &embedding).await;
        Ok(PipelineOutcome { note, persisted })
    }

    /// Re-run the pipeline for a stored note.
    ///
    /// At most one regeneration per note id may run at a time; a second
    /// attempt gets `Error::Busy`. Notes that still carry audio are fully
    /// re-transcribed client-side; audio-less notes delegate to the server's
    /// regenerate operation.
    #[instrument(skip(self), fields(
        subsystem = "pipeline",
        component = "notes",
        op = "regenerate",
        note_id = %id,
        provider = %llm_config.provider,
    ))]
    pub async fn regenerate_note(
        &self,
        id: &str,
        llm_config: &LlmConfig,
    ) -> Result<PipelineOutcome> {
        let _guard = self.claim_regeneration(id)?;

        let note = self.store.fetch(id).await?;
        match note.audio.clone() {
            Some(audio) => self.regenerate_from_audio(note, audio, llm_config).await,
            None => self.regenerate_remote(note, llm_config).await,
        }
    }

    async fn regenerate_from_audio(
        &self,
        note: Note,
        audio: AudioBlob,
        llm_config: &LlmConfig,
    ) -> Result<PipelineOutcome> {
        self.progress.report(stage::TRANSCRIBING);
        let transcription = self.transcriber.transcribe(&audio, None).await?;
        let language = language_of(&transcription);

        // The transcript changed, so the embedding must change with it.
        let (analysis, embedding) = self
            .analyze_and_embed(&transcription.transcript, llm_config, language)
            .await?;

        self.progress.report(stage::SAVING);
        let refreshed = Note {
            id: note.id,
            title: analysis.title,
            summary: analysis.summary,
            transcript: prefer_transcript(analysis.transcript, transcription.transcript),
            tags: analysis.tags,
            created_at: note.created_at,
            duration_secs: note.duration_secs,
            source_type: note.source_type,
            llm_provider: llm_config.provider.to_string(),
            vector_score: None,
            audio: Some(audio),
        };
        let persisted = self.persist(&refreshed, &embedding).await;
        Ok(PipelineOutcome {
            note: refreshed,
            persisted,
        })
    }

    async fn regenerate_remote(
        &self,
        mut note: Note,
        llm_config: &LlmConfig,
    ) -> Result<PipelineOutcome> {
        self.progress.report(stage::ANALYZING);
        let analysis = self.store.regenerate(&note.id, llm_config).await?;

        note.title = analysis.title;
        note.summary = analysis.summary;
        note.tags = analysis.tags;
        if !analysis.transcript.trim().is_empty() {
            note.transcript = analysis.transcript;
        }
        note.llm_provider = llm_config.provider.to_string();

        info!(note_id = %note.id, "Note regenerated server-side");
        // The server stored the refreshed note and embedding in the same call.
        Ok(PipelineOutcome {
            note,
            persisted: true,
        })
    }

    /// Analysis and embedding for one transcript. The embedding is computed
    /// from the verbatim transcript, not the analysis echo, so search indexes
    /// what was actually said.
    async fn analyze_and_embed(
        &self,
        transcript: &str,
        llm_config: &LlmConfig,
        language: Language,
    ) -> Result<(sotto_core::NoteAnalysis, Vec<f32>)> {
        self.progress.report(stage::ANALYZING);
        let analysis = self.analyzer.analyze(transcript, llm_config, language).await?;

        self.progress.report(stage::EMBEDDING);
        let embedding = self.embedder.embed(transcript).await?;

        Ok((analysis, embedding))
    }

    async fn persist(&self, note: &Note, embedding: &[f32]) -> bool {
        match self.store.save(note, embedding).await {
            Ok(()) => {
                info!(note_id = %note.id, "Note saved");
                true
            }
            Err(e) => {
                warn!(
                    note_id = %note.id,
                    error_msg = %e,
                    "Note not persisted, keeping it locally"
                );
                false
            }
        }
    }

    fn claim_regeneration(&self, id: &str) -> Result<RegenerationGuard<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap();
        if !in_flight.insert(id.to_string()) {
            return Err(Error::Busy(format!(
                "regeneration already running for note {id}"
            )));
        }
        Ok(RegenerationGuard {
            set: &self.in_flight,
            id: id.to_string(),
        })
    }
}

/// Releases a note's regeneration claim when dropped.
struct RegenerationGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for RegenerationGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.set.lock() {
            in_flight.remove(&self.id);
        }
    }
}

fn language_of(transcription: &TranscriptionOutcome) -> Language {
    match transcription.detected_language.as_deref() {
        Some(code) => Language::from_code(code),
        None => Language::detect(&transcription.transcript),
    }
}

fn prefer_transcript(analysis: String, original: String) -> String {
    if analysis.trim().is_empty() {
        original
    } else {
        analysis
    }
}
