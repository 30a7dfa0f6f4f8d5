//! LLM provider selection and model configuration.
//!
//! Providers expose divergent APIs; everything downstream dispatches on
//! [`LlmProvider`] through the `ChatCompletionProvider` strategy trait, so
//! this module only owns naming, known model sets, and validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported chat/analysis providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Grok,
    Gemini,
}

impl LlmProvider {
    /// All providers, in the order the settings surface lists them.
    pub const ALL: [LlmProvider; 3] = [LlmProvider::OpenAi, LlmProvider::Grok, LlmProvider::Gemini];

    /// Models this provider is known to serve, default first.
    pub fn known_models(&self) -> &'static [&'static str] {
        match self {
            LlmProvider::OpenAi => &["gpt-4o-mini", "gpt-4o", "gpt-4.1-mini", "gpt-4.1"],
            LlmProvider::Grok => &["grok-3-mini", "grok-3", "grok-2-latest"],
            LlmProvider::Gemini => &["gemini-2.0-flash", "gemini-2.5-flash", "gemini-2.5-pro"],
        }
    }

    /// The model selected when this provider is chosen.
    pub fn default_model(&self) -> &'static str {
        self.known_models()[0]
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Grok => "grok",
            LlmProvider::Gemini => "gemini",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for LlmProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "grok" => Ok(LlmProvider::Grok),
            "gemini" => Ok(LlmProvider::Gemini),
            other => Err(Error::InvalidInput(format!(
                "unknown LLM provider: {}",
                other
            ))),
        }
    }
}

/// Active provider + model pair sent with analysis, regeneration, and chat
/// requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
}

impl LlmConfig {
    /// Configuration for a provider with its default model.
    pub fn new(provider: LlmProvider) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
        }
    }

    /// Select a specific model, validated against the provider's known set.
    pub fn with_model(provider: LlmProvider, model: &str) -> Result<Self> {
        if !provider.known_models().contains(&model) {
            return Err(Error::InvalidInput(format!(
                "model {} is not known for provider {}",
                model, provider
            )));
        }
        Ok(Self {
            provider,
            model: model.to_string(),
        })
    }

    /// Switch providers. The model always resets to the new provider's
    /// default; a model name is never carried across providers.
    pub fn set_provider(&mut self, provider: LlmProvider) {
        self.provider = provider;
        self.model = provider.default_model().to_string();
    }

    /// Check the pair is coherent (used when a config arrives from storage
    /// or a flag rather than through the constructors).
    pub fn validate(&self) -> Result<()> {
        if self.provider.known_models().contains(&self.model.as_str()) {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "model {} is not known for provider {}",
                self.model, self.provider
            )))
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::new(LlmProvider::OpenAi)
    }
}
