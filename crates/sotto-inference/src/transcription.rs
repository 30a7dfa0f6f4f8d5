//! Speech-to-text client for the transcription service.
//!
//! Transcription is a three-phase exchange: upload the raw audio bytes,
//! submit a job referencing the upload handle, then poll the job until it
//! reaches a terminal status. The polling budget is an explicit
//! [`PollPolicy`] so callers (and tests) can bound how long a stuck job is
//! allowed to spin.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use sotto_core::progress::stage;
use sotto_core::{defaults, AudioBlob, Error, NoopProgress, ProgressSink, Result};

// ============================================================================
// Trait
// ============================================================================

/// Result of a completed transcription job.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionOutcome {
    /// Verbatim transcript text.
    pub transcript: String,
    /// Language code reported by the service (e.g. "en", "zh"), when known.
    pub detected_language: Option<String>,
}

/// Backend capable of turning recorded audio into text.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe `audio`, optionally hinting the spoken language.
    async fn transcribe(
        &self,
        audio: &AudioBlob,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionOutcome>;
}

// ============================================================================
// Poll policy
// ============================================================================

/// Retry budget for job polling.
///
/// The total budget is `interval * max_attempts`; once spent, the job is
/// reported as a [`Error::Transcription`] timeout even though the service
/// may still complete it later.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// Delay between consecutive status checks.
    pub interval: Duration,
    /// Number of status checks before giving up.
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Total wall-clock budget this policy allows.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(defaults::TRANSCRIBE_POLL_INTERVAL_SECS),
            max_attempts: defaults::TRANSCRIBE_POLL_MAX_ATTEMPTS,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Connection settings for the transcription service.
#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    /// Service base URL, without trailing slash.
    pub base_url: String,
    /// Bearer token for the service.
    pub api_key: String,
    /// Polling budget for submitted jobs.
    pub poll: PollPolicy,
    /// Per-request timeout for the audio upload, which can be large.
    pub upload_timeout_secs: u64,
}

impl TranscriberConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key: api_key.into(),
            poll: PollPolicy::default(),
            upload_timeout_secs: defaults::TRANSCRIBE_UPLOAD_TIMEOUT_SECS,
        }
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_upload_timeout_secs(mut self, secs: u64) -> Self {
        self.upload_timeout_secs = secs;
        self
    }

    /// Build from `TRANSCRIBE_URL` and `TRANSCRIBE_API_KEY`.
    ///
    /// Returns `None` unless both are set and non-empty.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("TRANSCRIBE_URL").ok()?;
        let api_key = std::env::var("TRANSCRIBE_API_KEY").ok()?;
        if base_url.trim().is_empty() || api_key.trim().is_empty() {
            return None;
        }
        Some(Self::new(base_url, api_key))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// ============================================================================
// Polling transcriber
// ============================================================================

/// HTTP client for the upload/submit/poll transcription protocol.
pub struct PollingTranscriber {
    client: Client,
    config: TranscriberConfig,
    progress: Arc<dyn ProgressSink>,
}

impl PollingTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(defaults::HTTP_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            config,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Upload raw audio bytes, returning the service's blob handle.
    async fn upload(&self, audio: &AudioBlob) -> Result<String> {
        self.progress.report(stage::UPLOADING);
        let response = self
            .client
            .post(self.config.endpoint("/upload"))
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .timeout(Duration::from_secs(self.config.upload_timeout_secs))
            .body(audio.bytes.clone())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(reject("upload", response).await);
        }

        let body: UploadResponse = response.json().await?;
        debug!(bytes = audio.bytes.len(), "Uploaded audio blob");
        Ok(body.upload_url)
    }

    /// Submit a transcription job for an uploaded blob, returning the job id.
    async fn submit(&self, blob_handle: &str, language_hint: Option<&str>) -> Result<String> {
        let response = self
            .client
            .post(self.config.endpoint("/transcribe"))
            .bearer_auth(&self.config.api_key)
            .json(&SubmitRequest {
                audio_blob: blob_handle,
                language: language_hint,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(reject("submit", response).await);
        }

        let body: SubmitResponse = response.json().await?;
        Ok(body.id)
    }

    async fn fetch_status(&self, job_id: &str) -> Result<StatusResponse> {
        let response = self
            .client
            .get(self.config.endpoint(&format!("/transcribe/{job_id}")))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(reject("status", response).await);
        }

        Ok(response.json().await?)
    }

    /// Poll the job until completed, failed, or out of budget.
    async fn poll(&self, job_id: &str) -> Result<StatusResponse> {
        let policy = &self.config.poll;
        for attempt in 1..=policy.max_attempts {
            let status = self.fetch_status(job_id).await?;
            debug!(attempt, status = %status.status, "Polled transcription job");

            match status.status.as_str() {
                "completed" => return Ok(status),
                "error" => {
                    let detail = status
                        .error
                        .unwrap_or_else(|| "transcription failed".to_string());
                    return Err(Error::Transcription(detail));
                }
                "queued" => self.progress.report(stage::QUEUED),
                "processing" => self.progress.report(stage::PROCESSING),
                // Unknown statuses count as still in progress.
                other => debug!(status = other, "Unrecognized transcription status"),
            }

            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.interval).await;
            }
        }

        Err(Error::Transcription(format!(
            "no result after {} poll attempts ({}s budget)",
            policy.max_attempts,
            policy.budget().as_secs()
        )))
    }
}

#[async_trait]
impl TranscriptionBackend for PollingTranscriber {
    #[instrument(skip(self, audio), fields(
        subsystem = "inference",
        component = "transcriber",
        op = "transcribe",
        audio_bytes = audio.bytes.len(),
        mime = %audio.mime,
    ))]
    async fn transcribe(
        &self,
        audio: &AudioBlob,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionOutcome> {
        if audio.is_empty() {
            return Err(Error::InvalidInput("audio is empty".to_string()));
        }

        let start = Instant::now();
        let blob_handle = self.upload(audio).await?;
        let job_id = self.submit(&blob_handle, language_hint).await?;
        debug!(job_id = %job_id, "Submitted transcription job");

        let status = self.poll(&job_id).await?;
        let transcript = status.transcript.unwrap_or_default();
        if transcript.is_empty() {
            warn!(job_id = %job_id, "Transcription completed with empty transcript");
        }

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            transcript_chars = transcript.chars().count(),
            detected_language = status.detected_language.as_deref().unwrap_or("unknown"),
            "Transcription complete"
        );

        Ok(TranscriptionOutcome {
            transcript,
            detected_language: status.detected_language,
        })
    }
}

async fn reject(op: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        Error::Unauthorized(format!("transcription {op} rejected: {body}"))
    } else {
        Error::Transcription(format!("{op} returned {status}: {body}"))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    #[serde(rename = "audioBlob")]
    audio_blob: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "uploadUrl")]
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default, rename = "detectedLanguage")]
    detected_language: Option<String>,
    #[serde(default)]
    error: Option<String>,
}
