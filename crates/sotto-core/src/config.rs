//! Backend configuration.
//!
//! All configuration is explicit: structs built at startup and injected into
//! clients. There are no globals and no lazy statics; tests construct configs
//! pointing at mock servers the same way the binary constructs them from the
//! environment.

use crate::defaults;

/// Connection settings for the app backend, which serves the note and
/// session stores, the health probe, and the inference routes (orchestrate,
/// embed, chat).
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL without a trailing slash, e.g. "https://api.example.com".
    pub base_url: String,
    /// Bearer credential for protected routes. `None` makes protected calls
    /// fail fast with `Unauthorized` before any request is issued.
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            api_token: None,
            timeout_secs: defaults::HTTP_TIMEOUT_SECS,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Read `SOTTO_BASE_URL` and `SOTTO_API_TOKEN` from the environment.
    /// Returns `None` when no base URL is configured.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("SOTTO_BASE_URL").ok()?;
        let mut config = Self::new(base_url);
        if let Ok(token) = std::env::var("SOTTO_API_TOKEN") {
            if !token.is_empty() {
                config.api_token = Some(token);
            }
        }
        Some(config)
    }

    /// Join a path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_normalized() {
        let config = BackendConfig::new("http://localhost:3000/");
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.endpoint("/notes"), "http://localhost:3000/notes");
        assert_eq!(config.endpoint("notes"), "http://localhost:3000/notes");
    }

    #[test]
    fn test_builder_methods() {
        let config = BackendConfig::new("http://x")
            .with_token("secret")
            .with_timeout_secs(5);
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_default_timeout_from_defaults() {
        let config = BackendConfig::new("http://x");
        assert_eq!(config.timeout_secs, defaults::HTTP_TIMEOUT_SECS);
    }
}
