//! Hybrid note search for sotto.
//!
//! Combines an instant case-insensitive local filter with remote vector
//! search, merged so that notes found by both appear once, in the position
//! the local filter gave them, carrying the remote result's score. Typed
//! queries go through a generation-counted debouncer so only the latest
//! query ever reaches the network.

pub mod debounce;
pub mod hybrid;

pub use debounce::{DebounceTicket, DebouncedSearch, SearchDebouncer};
pub use hybrid::{local_filter, merge_results, HybridSearchEngine, SearchOutcome};
