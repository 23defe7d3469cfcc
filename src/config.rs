//! Process-wide configuration.
//!
//! Resolved once at startup from the environment (after an optional `.env`
//! is loaded by the binary) and then passed by reference. Nothing in the
//! pipeline reads environment variables while a note is being processed.

use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::pipeline::PipelineError;

/// Application-level constants
pub const APP_NAME: &str = "DocSathi";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-5-mini";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "docsathi_lib=info,docsathi=info"
}

/// Which text-generation backend serves extraction requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// OpenAI-compatible chat completions API.
    OpenAi,
    /// Local Ollama instance.
    Ollama,
}

impl FromStr for Provider {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" | "open-ai" => Ok(Provider::OpenAi),
            "ollama" | "local" => Ok(Provider::Ollama),
            other => Err(PipelineError::Configuration(format!(
                "unknown provider '{other}' (expected 'openai' or 'ollama')"
            ))),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => f.write_str("openai"),
            Provider::Ollama => f.write_str("ollama"),
        }
    }
}

/// Configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub timeout_secs: u64,
    /// Enables the diagnostic dump when set.
    pub dump_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            dump_dir: None,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let provider = match get("DOCSATHI_PROVIDER") {
            Some(p) => p.parse()?,
            None => defaults.provider,
        };

        let timeout_secs = match get("DOCSATHI_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                PipelineError::Configuration(format!(
                    "DOCSATHI_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"
                ))
            })?,
            None => defaults.timeout_secs,
        };

        Ok(Self {
            provider,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            ollama_base_url: get("OLLAMA_BASE_URL").unwrap_or(defaults.ollama_base_url),
            ollama_model: get("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            timeout_secs,
            dump_dir: get("DOCSATHI_DUMP_DIR").map(PathBuf::from),
        })
    }

    /// Whether live extraction is possible for the selected provider.
    pub fn has_credentials(&self) -> bool {
        match self.provider {
            Provider::OpenAi => self.openai_api_key.is_some(),
            Provider::Ollama => true,
        }
    }

    /// Model identifier for the selected provider.
    pub fn model(&self) -> &str {
        match self.provider {
            Provider::OpenAi => &self.openai_model,
            Provider::Ollama => &self.ollama_model,
        }
    }

    /// Endpoint for the selected provider.
    pub fn base_url(&self) -> &str {
        match self.provider {
            Provider::OpenAi => &self.openai_base_url,
            Provider::Ollama => &self.ollama_base_url,
        }
    }
}
