//! Backend selection
//!
//! Maps the configured backend type to a concrete `ChatBackend`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CrewlineConfig;
use crate::error::{Error, Result};

use super::{MockBackend, OpenAiBackend, OpenAiConfig, SharedBackend};

// ─────────────────────────────────────────────────────────────────
// Backend Type
// ─────────────────────────────────────────────────────────────────

/// Supported backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// OpenAI-compatible API backend (Groq by default)
    #[default]
    OpenAi,
    /// Local mock backend
    Mock,
}

impl BackendType {
    /// Get the backend name
    pub fn name(&self) -> &'static str {
        match self {
            BackendType::OpenAi => "openai",
            BackendType::Mock => "mock",
        }
    }
}

impl FromStr for BackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "groq" => Ok(BackendType::OpenAi),
            "mock" => Ok(BackendType::Mock),
            other => Err(Error::config_field_invalid(
                "llm.backend",
                format!("unknown backend '{}' (expected openai or mock)", other),
            )),
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────
// Backend Factory
// ─────────────────────────────────────────────────────────────────

/// Factory for creating backends
pub struct BackendFactory;

impl BackendFactory {
    /// Create the backend selected by `config.llm.backend`
    ///
    /// The OpenAI backend requires an API key; its absence is reported here,
    /// before any request is attempted.
    pub fn create(config: &CrewlineConfig) -> Result<SharedBackend> {
        debug!(backend = %config.llm.backend, "Creating chat backend");
        match config.llm.backend {
            BackendType::OpenAi => {
                let api_key = config.require_llm_key()?;
                let openai = OpenAiConfig::from_settings(&config.llm, api_key);
                Ok(Arc::new(OpenAiBackend::new(openai)?))
            }
            BackendType::Mock => {
                let backend = match &config.llm.mock_response {
                    Some(text) => MockBackend::fixed_response(text.clone()),
                    None => MockBackend::new(),
                };
                Ok(Arc::new(backend))
            }
        }
    }
}
