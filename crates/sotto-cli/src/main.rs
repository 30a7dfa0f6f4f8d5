//! sotto: voice-note knowledge base from the terminal.
//!
//! Wires the remote store, transcription, analysis, search, and chat crates
//! into one binary. Configuration comes from the environment (a local `.env`
//! file is honored): `SOTTO_BASE_URL`, `SOTTO_API_TOKEN`, `TRANSCRIBE_URL`,
//! `TRANSCRIBE_API_KEY`, and `OPENAI_API_KEY`/`GROK_API_KEY`/`GEMINI_API_KEY`
//! for direct provider fallback.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};

use sotto_chat::ChatConversationManager;
use sotto_core::logging::init_tracing;
use sotto_core::{
    AudioBlob, BackendConfig, ChatSessionRepository, LlmConfig, LlmProvider, Note, NoteRepository,
    ProgressSink,
};
use sotto_inference::{
    Analyzer, ChatResponder, CredentialProviderFactory, OrchestratorClient, PollingTranscriber,
    RemoteEmbedder, TranscriberConfig,
};
use sotto_pipeline::{DocumentInput, NewRecording, NotePipeline};
use sotto_search::HybridSearchEngine;
use sotto_store::{HealthClient, RemoteNoteStore, RemoteSessionStore};

#[derive(Parser)]
#[command(name = "sotto")]
#[command(author, version, about = "Voice-note knowledge base from the terminal")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the backend health route
    Health,

    /// Create a note from a recorded audio file
    Add {
        /// Audio file (m4a, mp3, wav, webm, ogg)
        file: PathBuf,

        /// Recording length in seconds
        #[arg(long)]
        duration_secs: f64,

        /// Language hint forwarded to transcription (e.g. "en", "zh")
        #[arg(long)]
        language: Option<String>,

        #[command(flatten)]
        llm: LlmFlags,
    },

    /// Create a note from already-extracted document text
    Import {
        /// Text file with the extracted document content
        file: PathBuf,

        /// Title used when the analysis produces none (default: the file name)
        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        llm: LlmFlags,
    },

    /// List all notes, newest first
    List,

    /// Show one note in full
    Show {
        /// Note id
        id: String,
    },

    /// Delete a note
    Delete {
        /// Note id
        id: String,
    },

    /// Re-run transcription and analysis for a stored note
    Regen {
        /// Note id
        id: String,

        #[command(flatten)]
        llm: LlmFlags,
    },

    /// Hybrid substring/vector search across the note corpus
    Search {
        /// Query text
        query: String,
    },

    /// Ask a question over your notes
    Chat {
        /// The message to send
        message: String,

        #[command(flatten)]
        llm: LlmFlags,
    },

    /// List chat sessions, most recent first
    Sessions,
}

#[derive(Args)]
struct LlmFlags {
    /// LLM provider: openai, grok, or gemini
    #[arg(long)]
    provider: Option<String>,

    /// Model name (must be known for the chosen provider)
    #[arg(long)]
    model: Option<String>,
}

impl LlmFlags {
    fn into_config(self) -> anyhow::Result<LlmConfig> {
        let provider = match self.provider.as_deref() {
            Some(name) => name.parse::<LlmProvider>()?,
            None => LlmConfig::default().provider,
        };
        let config = match self.model.as_deref() {
            Some(model) => LlmConfig::with_model(provider, model)?,
            None => LlmConfig::new(provider),
        };
        Ok(config)
    }
}

/// Prints pipeline stages to stderr so stdout stays clean for output.
struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn report(&self, stage: &str) {
        eprintln!("[{}]", stage);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Health => cmd_health().await,
        Commands::Add {
            file,
            duration_secs,
            language,
            llm,
        } => cmd_add(&file, duration_secs, language, llm.into_config()?).await,
        Commands::Import { file, title, llm } => cmd_import(&file, title, llm.into_config()?).await,
        Commands::List => cmd_list().await,
        Commands::Show { id } => cmd_show(&id).await,
        Commands::Delete { id } => cmd_delete(&id).await,
        Commands::Regen { id, llm } => cmd_regen(&id, llm.into_config()?).await,
        Commands::Search { query } => cmd_search(&query).await,
        Commands::Chat { message, llm } => cmd_chat(&message, llm.into_config()?).await,
        Commands::Sessions => cmd_sessions().await,
    }
}

// ============================================================================
// Wiring
// ============================================================================

fn backend_from_env() -> anyhow::Result<BackendConfig> {
    BackendConfig::from_env().context("SOTTO_BASE_URL is not set")
}

fn note_store() -> anyhow::Result<Arc<RemoteNoteStore>> {
    Ok(Arc::new(RemoteNoteStore::new(backend_from_env()?)))
}

/// Full note pipeline: transcriber, analyzer with provider fallback,
/// embedder, remote store.
fn build_pipeline() -> anyhow::Result<NotePipeline> {
    let backend = backend_from_env()?;
    let transcriber_config =
        TranscriberConfig::from_env().context("TRANSCRIBE_URL / TRANSCRIBE_API_KEY are not set")?;

    let progress: Arc<dyn ProgressSink> = Arc::new(StderrProgress);
    let transcriber =
        Arc::new(PollingTranscriber::new(transcriber_config).with_progress(progress.clone()));
    let factory = Arc::new(CredentialProviderFactory::from_env());
    let analyzer = Arc::new(Analyzer::new(
        OrchestratorClient::new(backend.clone()),
        factory,
    ));
    let embedder = Arc::new(RemoteEmbedder::new(backend.clone()));
    let store = Arc::new(RemoteNoteStore::new(backend));

    Ok(NotePipeline::new(transcriber, analyzer, embedder, store).with_progress(progress))
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_health() -> anyhow::Result<()> {
    let report = HealthClient::new(backend_from_env()?).probe().await?;
    println!("status:  {}", report.status);
    println!("mongodb: {}", if report.mongodb { "up" } else { "down" });
    println!("voyage:  {}", if report.voyage { "up" } else { "down" });
    if !report.is_healthy() {
        bail!("backend is not healthy");
    }
    Ok(())
}

async fn cmd_add(
    file: &Path,
    duration_secs: f64,
    language: Option<String>,
    config: LlmConfig,
) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("could not read {}", file.display()))?;
    let recording = NewRecording {
        audio: AudioBlob::new(bytes, mime_for(file)),
        duration_secs,
        language_hint: language,
    };

    let pipeline = build_pipeline()?;
    let outcome = pipeline.create_note(recording, &config).await?;
    print_note(&outcome.note, false);
    if !outcome.persisted {
        eprintln!("warning: the backend rejected the save; the note was not persisted");
    }
    Ok(())
}

async fn cmd_import(file: &Path, title: Option<String>, config: LlmConfig) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("could not read {}", file.display()))?;
    let title_hint = title.or_else(|| file.file_name().map(|n| n.to_string_lossy().into_owned()));

    let pipeline = build_pipeline()?;
    let outcome = pipeline
        .create_note_from_text(DocumentInput { text, title_hint }, &config)
        .await?;
    print_note(&outcome.note, false);
    if !outcome.persisted {
        eprintln!("warning: the backend rejected the save; the note was not persisted");
    }
    Ok(())
}

async fn cmd_list() -> anyhow::Result<()> {
    let store = note_store()?;
    let notes = store.list().await?;
    if notes.is_empty() {
        println!("no notes yet");
        return Ok(());
    }
    for note in &notes {
        println!(
            "{}  {}  {}",
            note.id,
            note.created_at.format("%Y-%m-%d %H:%M"),
            note.title
        );
    }
    println!("{} note(s)", notes.len());
    Ok(())
}

async fn cmd_show(id: &str) -> anyhow::Result<()> {
    let store = note_store()?;
    let note = store.fetch(id).await?;
    print_note(&note, true);
    Ok(())
}

async fn cmd_delete(id: &str) -> anyhow::Result<()> {
    let store = note_store()?;
    store.delete(id).await?;
    println!("deleted {}", id);
    Ok(())
}

async fn cmd_regen(id: &str, config: LlmConfig) -> anyhow::Result<()> {
    let pipeline = build_pipeline()?;
    let outcome = pipeline.regenerate_note(id, &config).await?;
    print_note(&outcome.note, false);
    if !outcome.persisted {
        eprintln!("warning: the backend rejected the save; the note was not persisted");
    }
    Ok(())
}

async fn cmd_search(query: &str) -> anyhow::Result<()> {
    let store = note_store()?;
    let corpus = store.list().await?;
    let engine = HybridSearchEngine::new(store);

    let outcome = engine.search(query, &corpus).await;
    if let Some(error) = &outcome.remote_error {
        eprintln!(
            "warning: vector search unavailable ({}); showing local matches only",
            error
        );
    }
    if outcome.notes.is_empty() {
        println!("no matches");
        return Ok(());
    }
    for note in &outcome.notes {
        match note.vector_score {
            Some(score) => println!("{:.3}  {}  {}", score, note.id, note.title),
            None => println!("  -    {}  {}", note.id, note.title),
        }
    }
    Ok(())
}

async fn cmd_chat(message: &str, config: LlmConfig) -> anyhow::Result<()> {
    let backend = backend_from_env()?;
    let notes = Arc::new(RemoteNoteStore::new(backend.clone()));
    let sessions = Arc::new(RemoteSessionStore::new(backend.clone()));
    let factory = Arc::new(CredentialProviderFactory::from_env());
    let responder = Arc::new(ChatResponder::new(OrchestratorClient::new(backend), factory));

    let mut manager = ChatConversationManager::new(sessions, notes, responder)
        .with_progress(Arc::new(StderrProgress));
    manager.resume_latest().await;

    let outcome = manager.send_message(message, &config).await?;
    eprintln!("(context: {} note(s))", outcome.context_count);
    if outcome.completion_failed {
        eprintln!("warning: generation failed; showing the fallback reply");
    }
    println!("{}", outcome.reply.text);
    Ok(())
}

async fn cmd_sessions() -> anyhow::Result<()> {
    let store = RemoteSessionStore::new(backend_from_env()?);
    let mut sessions = store.list().await?;
    if sessions.is_empty() {
        println!("no sessions yet");
        return Ok(());
    }
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    for session in &sessions {
        let title = if session.title.is_empty() {
            "(untitled)"
        } else {
            &session.title
        };
        println!(
            "{}  {}  {} ({} messages)",
            session.id,
            session.updated_at.format("%Y-%m-%d %H:%M"),
            title,
            session.messages.len()
        );
    }
    Ok(())
}

// ============================================================================
// Output helpers
// ============================================================================

fn print_note(note: &Note, full: bool) {
    println!("id:       {}", note.id);
    println!("title:    {}", note.title);
    println!("created:  {}", note.created_at.format("%Y-%m-%d %H:%M"));
    if note.duration_secs > 0.0 {
        println!("duration: {:.1}s", note.duration_secs);
    }
    println!("provider: {}", note.llm_provider);
    if !note.tags.is_empty() {
        println!("tags:     {}", note.tags.join(", "));
    }
    println!("summary:  {}", note.summary);
    if full {
        if let Some(audio) = &note.audio {
            println!("audio:    {} bytes ({})", audio.bytes.len(), audio.mime);
        }
        println!();
        println!("{}", note.transcript);
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("m4a") => "audio/m4a",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("webm") => "audio/webm",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}
