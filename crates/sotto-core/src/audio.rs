//! Audio codec boundary.
//!
//! Audio exists in exactly two representations: binary in memory, base64 +
//! MIME type on the wire. This module is the only place that converts
//! between them; the store's boundary types call these helpers and nothing
//! else touches base64.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Decoded audio payload held in memory alongside a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioBlob {
    pub bytes: Vec<u8>,
    /// MIME type reported by the capture layer, e.g. "audio/m4a".
    pub mime: String,
}

impl AudioBlob {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encode a blob into its wire pair: (base64 data, MIME type).
pub fn encode_audio(blob: &AudioBlob) -> (String, String) {
    (STANDARD.encode(&blob.bytes), blob.mime.clone())
}

/// Decode the wire pair back into a blob.
///
/// Corrupt base64 is an input error: the payload was produced by our own
/// encode path, so damage means the stored document was truncated or edited.
pub fn decode_audio(data: &str, mime: &str) -> Result<AudioBlob> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| Error::InvalidInput(format!("invalid base64 audio data: {}", e)))?;
    Ok(AudioBlob::new(bytes, mime))
}
