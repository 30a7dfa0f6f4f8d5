//! Remote embedding generation.
//!
//! Embeddings come from the backend's `/embed` route, which fronts the
//! actual embedding provider. Failures here are always hard failures: a note
//! saved without a real embedding would be invisible to vector search, so
//! callers never get a zero vector or an empty one back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use sotto_core::traits::EmbeddingBackend;
use sotto_core::{defaults, BackendConfig, Error, Result};

/// HTTP client for `POST /embed`.
pub struct RemoteEmbedder {
    client: Client,
    config: BackendConfig,
    dimension: usize,
}

impl RemoteEmbedder {
    pub fn new(config: BackendConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(defaults::HTTP_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            config,
            dimension: defaults::EMBED_DIMENSION,
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    fn bearer(&self) -> Result<&str> {
        self.config
            .api_token
            .as_deref()
            .ok_or_else(|| Error::Unauthorized("no API token configured".to_string()))
    }
}

#[async_trait]
impl EmbeddingBackend for RemoteEmbedder {
    #[instrument(skip(self, text), fields(
        subsystem = "inference",
        component = "embedder",
        op = "embed",
        text_chars = text.chars().count(),
    ))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("cannot embed empty text".to_string()));
        }

        let token = self.bearer()?;
        let response = self
            .client
            .post(self.config.endpoint("/embed"))
            .bearer_auth(token)
            .json(&EmbedRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(Error::Unauthorized(format!("embed rejected: {body}")));
            }
            return Err(Error::Embedding(format!("embed returned {status}: {body}")));
        }

        let body: EmbedResponse = response.json().await?;
        if body.embedding.is_empty() {
            return Err(Error::Embedding(
                "backend returned an empty embedding".to_string(),
            ));
        }
        if body.embedding.len() != self.dimension {
            // The server's dimension wins; the local value only drives this check.
            warn!(
                expected = self.dimension,
                actual = body.embedding.len(),
                "Embedding dimension differs from the configured value"
            );
        }

        debug!(dimension = body.embedding.len(), "Embedded text");
        Ok(body.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dimension() {
        let embedder = RemoteEmbedder::new(BackendConfig::new("http://mock"));
        assert_eq!(embedder.dimension(), defaults::EMBED_DIMENSION);
        assert_eq!(embedder.with_dimension(512).dimension(), 512);
    }

    #[test]
    fn test_embed_response_parse() {
        let parsed: EmbedResponse =
            serde_json::from_str(r#"{"embedding":[0.25,-0.5,1.0]}"#).unwrap();
        assert_eq!(parsed.embedding, vec![0.25, -0.5, 1.0]);

        let empty: EmbedResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.embedding.is_empty());
    }
}
