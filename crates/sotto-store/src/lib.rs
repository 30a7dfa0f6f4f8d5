//! # sotto-store
//!
//! HTTP repositories over the sotto backend: the note store, the chat
//! session store, and the health probe. All protected routes carry a bearer
//! credential; a client constructed without one fails fast with
//! `Unauthorized` instead of issuing doomed requests.
//!
//! Audio crosses the wire only here: the boundary types in [`wire`] encode
//! binary payloads to base64 on save and decode them on single-note fetch.
//! List and search responses never carry audio.

pub mod health;
mod http;
pub mod notes;
pub mod sessions;
mod wire;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use health::{HealthClient, HealthReport};
pub use notes::RemoteNoteStore;
pub use sessions::RemoteSessionStore;
