//! Local filtering, remote vector search, and the merge between them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use sotto_core::traits::NoteRepository;
use sotto_core::{defaults, Note};

// ============================================================================
// Outcome
// ============================================================================

/// Result of one hybrid search round.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Merged results, local matches first.
    pub notes: Vec<Note>,
    /// Set when the remote leg failed and only local matches are shown.
    pub remote_error: Option<String>,
}

impl SearchOutcome {
    /// Outcome for a cleared or empty query.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when remote search failed and results are local-only.
    pub fn is_degraded(&self) -> bool {
        self.remote_error.is_some()
    }
}

// ============================================================================
// Local filter and merge
// ============================================================================

/// Case-insensitive substring match over title, tags, and summary.
///
/// Input order is preserved. Transcripts are deliberately not scanned; that
/// depth of matching is what the vector leg is for.
pub fn local_filter(notes: &[Note], query: &str) -> Vec<Note> {
    let needle = query.to_lowercase();
    notes
        .iter()
        .filter(|note| {
            note.title.to_lowercase().contains(&needle)
                || note.summary.to_lowercase().contains(&needle)
                || note
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

/// Merge local and remote results into one insertion-ordered list.
///
/// Locals are inserted first. A remote note colliding on id replaces the
/// stored value (bringing its `vector_score` along) but keeps the slot the
/// local insertion claimed; non-colliding remote notes append after the
/// locals.
pub fn merge_results(local: Vec<Note>, remote: Vec<Note>) -> Vec<Note> {
    let mut merged: Vec<Note> = Vec::with_capacity(local.len() + remote.len());
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(merged.capacity());

    for note in local.into_iter().chain(remote) {
        match slots.get(&note.id) {
            Some(&slot) => merged[slot] = note,
            None => {
                slots.insert(note.id.clone(), merged.len());
                merged.push(note);
            }
        }
    }
    merged
}

// ============================================================================
// Engine
// ============================================================================

/// Runs the local and remote legs concurrently and merges their results.
pub struct HybridSearchEngine {
    store: Arc<dyn NoteRepository>,
}

impl HybridSearchEngine {
    pub fn new(store: Arc<dyn NoteRepository>) -> Self {
        Self { store }
    }

    /// Search `query` against the in-memory `notes` and the remote index.
    ///
    /// An empty or whitespace query returns an empty outcome without touching
    /// the network. A failed remote leg degrades to local-only results with
    /// `remote_error` set; it never fails the search.
    #[instrument(skip(self, notes), fields(
        subsystem = "search",
        component = "hybrid",
        op = "search",
        query = %query,
        local_pool = notes.len(),
    ))]
    pub async fn search(&self, query: &str, notes: &[Note]) -> SearchOutcome {
        let query = query.trim();
        if query.is_empty() {
            return SearchOutcome::empty();
        }

        let start = Instant::now();
        let (local, remote) = tokio::join!(
            async { local_filter(notes, query) },
            self.store.search(query)
        );

        match remote {
            Ok(mut remote_notes) => {
                remote_notes.truncate(defaults::SEARCH_TOP_K);
                let merged = merge_results(local, remote_notes);
                debug!(
                    result_count = merged.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Hybrid search merged"
                );
                SearchOutcome {
                    notes: merged,
                    remote_error: None,
                }
            }
            Err(e) => {
                warn!(
                    error_msg = %e,
                    local_count = local.len(),
                    "Remote search failed, serving local matches only"
                );
                SearchOutcome {
                    notes: local,
                    remote_error: Some(e.to_string()),
                }
            }
        }
    }
}
