//! Remote chat session repository.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument};

use sotto_core::{BackendConfig, ChatSession, ChatSessionRepository, Error, Result};

use crate::http::reject;
use crate::wire::SessionsEnvelope;

/// Chat session repository over the backend HTTP API. Sessions are stored
/// whole; every upsert replaces the full document under its id.
pub struct RemoteSessionStore {
    client: Client,
    config: BackendConfig,
}

impl RemoteSessionStore {
    pub fn new(config: BackendConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, config }
    }

    fn bearer(&self) -> Result<&str> {
        self.config
            .api_token
            .as_deref()
            .ok_or_else(|| Error::Unauthorized("no API token configured".to_string()))
    }
}

#[async_trait]
impl ChatSessionRepository for RemoteSessionStore {
    #[instrument(skip(self, session), fields(subsystem = "store", component = "sessions", op = "upsert", session_id = %session.id))]
    async fn upsert(&self, session: &ChatSession) -> Result<()> {
        // Drafts never travel. The manager skips them too; this check keeps
        // the invariant even for direct callers.
        if session.is_draft() {
            debug!("Skipping upsert for draft session");
            return Ok(());
        }
        let token = self.bearer()?;

        let response = self
            .client
            .put(self.config.endpoint(&format!("/chat-sessions/{}", session.id)))
            .bearer_auth(token)
            .json(session)
            .send()
            .await
            .map_err(|e| Error::Store(format!("session upsert failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(reject("upsert session", response, Error::Store).await);
        }

        debug!(
            message_count = session.messages.len(),
            "Session upserted"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "sessions", op = "list"))]
    async fn list(&self) -> Result<Vec<ChatSession>> {
        let token = self.bearer()?;

        let response = self
            .client
            .get(self.config.endpoint("/chat-sessions"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Store(format!("session list failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(reject("list sessions", response, Error::Store).await);
        }

        let envelope: SessionsEnvelope = response
            .json()
            .await
            .map_err(|e| Error::Store(format!("failed to parse session list: {}", e)))?;

        debug!(result_count = envelope.sessions.len(), "Listed sessions");
        Ok(envelope.sessions)
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "sessions", op = "latest"))]
    async fn latest(&self) -> Result<Option<ChatSession>> {
        let token = self.bearer()?;

        let response = self
            .client
            .get(self.config.endpoint("/chat-sessions/latest"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Store(format!("latest session request failed: {}", e)))?;

        // No sessions yet is a normal state, not an error.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(reject("latest session", response, Error::Store).await);
        }

        let session: ChatSession = response
            .json()
            .await
            .map_err(|e| Error::Store(format!("failed to parse session: {}", e)))?;
        Ok(Some(session))
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "sessions", op = "delete", session_id = %id))]
    async fn delete(&self, id: &str) -> Result<()> {
        let token = self.bearer()?;

        let response = self
            .client
            .delete(self.config.endpoint(&format!("/chat-sessions/{}", id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Store(format!("session delete failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(reject("delete session", response, Error::Store).await);
        }

        info!("Session deleted");
        Ok(())
    }
}
