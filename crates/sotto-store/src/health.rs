//! Backend capability probe.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{instrument, warn};

use sotto_core::{BackendConfig, Error, Result};

/// Response of `GET /health`. Field names follow the backend's probe format:
/// per-dependency booleans for the document store and the embedding service.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub mongodb: bool,
    pub voyage: bool,
}

impl HealthReport {
    /// All capabilities the engine depends on are up.
    pub fn is_healthy(&self) -> bool {
        self.status == "ok" && self.mongodb && self.voyage
    }
}

/// Client for the unauthenticated health route.
pub struct HealthClient {
    client: Client,
    config: BackendConfig,
}

impl HealthClient {
    pub fn new(config: BackendConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, config }
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "health", op = "probe"))]
    pub async fn probe(&self) -> Result<HealthReport> {
        let response = self
            .client
            .get(self.config.endpoint("/health"))
            .send()
            .await
            .map_err(|e| Error::Store(format!("health probe failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "health probe returned {}: {}",
                status, body
            )));
        }

        let report: HealthReport = response
            .json()
            .await
            .map_err(|e| Error::Store(format!("failed to parse health report: {}", e)))?;

        if !report.is_healthy() {
            warn!(
                status = %report.status,
                mongodb = report.mongodb,
                voyage = report.voyage,
                "Backend reports degraded capabilities"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_healthy_requires_all_capabilities() {
        let report = HealthReport {
            status: "ok".to_string(),
            mongodb: true,
            voyage: true,
        };
        assert!(report.is_healthy());

        let degraded = HealthReport {
            status: "ok".to_string(),
            mongodb: true,
            voyage: false,
        };
        assert!(!degraded.is_healthy());
    }

    #[test]
    fn test_report_parses_probe_shape() {
        let report: HealthReport =
            serde_json::from_str(r#"{"status":"ok","mongodb":true,"voyage":false}"#).unwrap();
        assert_eq!(report.status, "ok");
        assert!(!report.voyage);
    }
}
