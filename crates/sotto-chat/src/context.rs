//! Context assembly for chat completions.
//!
//! Retrieved notes become a plain-text block the provider reads as leading
//! context; prior messages are mapped to the provider-neutral turn shape.

use sotto_core::{ChatMessage, ChatRole, ChatTurn, Note};

/// Serialize retrieved notes into the plain-text context block.
///
/// One section per note, oldest field order matching what users see in the
/// app (title, date, summary, transcript). An empty slice yields an empty
/// string, which the backends treat as "no notes matched".
pub fn context_block(notes: &[Note]) -> String {
    notes
        .iter()
        .map(note_section)
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn note_section(note: &Note) -> String {
    format!(
        "Title: {}\nDate: {}\nSummary: {}\nTranscript: {}",
        note.title,
        note.created_at.format("%Y-%m-%d"),
        note.summary,
        note.transcript
    )
}

/// Map session history to provider-neutral turns, remapping the domain's
/// `model` role to `assistant`.
pub fn neutral_history(messages: &[ChatMessage]) -> Vec<ChatTurn> {
    messages
        .iter()
        .map(|message| match message.role {
            ChatRole::User => ChatTurn::user(message.text.clone()),
            ChatRole::Model => ChatTurn::assistant(message.text.clone()),
        })
        .collect()
}
