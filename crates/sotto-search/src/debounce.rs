//! Generation-counted search debouncing.
//!
//! Every query change takes a ticket stamped with a fresh generation number.
//! A ticket waits out the quiet period, then checks whether a newer ticket
//! has been issued; if so it is stale and its query is dropped. The same
//! check runs again after the remote call returns, so a slow response for an
//! old query can never overwrite results for a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use sotto_core::{defaults, Note};

use crate::hybrid::{HybridSearchEngine, SearchOutcome};

/// Issues [`DebounceTicket`]s, one per query change.
pub struct SearchDebouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl SearchDebouncer {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(defaults::SEARCH_DEBOUNCE_MS))
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Take a ticket for a new query, superseding all earlier tickets.
    pub fn begin(&self) -> DebounceTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        DebounceTicket {
            generation,
            counter: self.generation.clone(),
            delay: self.delay,
        }
    }
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

/// A claim on one query change.
pub struct DebounceTicket {
    generation: u64,
    counter: Arc<AtomicU64>,
    delay: Duration,
}

impl DebounceTicket {
    /// Wait out the quiet period; true when this ticket is still the newest.
    pub async fn settle(&self) -> bool {
        tokio::time::sleep(self.delay).await;
        self.is_current()
    }

    /// Whether no newer ticket has been issued since this one.
    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.generation
    }
}

/// Debounced front of the [`HybridSearchEngine`].
pub struct DebouncedSearch {
    debouncer: SearchDebouncer,
    engine: HybridSearchEngine,
}

impl DebouncedSearch {
    pub fn new(engine: HybridSearchEngine) -> Self {
        Self {
            debouncer: SearchDebouncer::new(),
            engine,
        }
    }

    pub fn with_delay(engine: HybridSearchEngine, delay: Duration) -> Self {
        Self {
            debouncer: SearchDebouncer::with_delay(delay),
            engine,
        }
    }

    /// React to the query text changing.
    ///
    /// Returns `None` when the query was superseded while debouncing or while
    /// the remote call was in flight. An emptied query clears immediately:
    /// no quiet period, no remote call, and all in-flight tickets go stale.
    #[instrument(skip(self, notes), fields(
        subsystem = "search",
        component = "debounce",
        op = "query_changed",
        query = %query,
    ))]
    pub async fn query_changed(&self, query: &str, notes: &[Note]) -> Option<SearchOutcome> {
        let ticket = self.debouncer.begin();

        if query.trim().is_empty() {
            debug!("Query cleared");
            return Some(SearchOutcome::empty());
        }

        if !ticket.settle().await {
            debug!("Query superseded while debouncing");
            return None;
        }

        let outcome = self.engine.search(query, notes).await;

        if !ticket.is_current() {
            debug!("Query superseded during remote search");
            return None;
        }
        Some(outcome)
    }
}
