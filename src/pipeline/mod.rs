pub mod masking;
pub mod extraction;
pub mod normalize;
pub mod validation;
pub mod fhir;
pub mod orchestrator;
pub mod diagnostic; // Opt-in dump of intermediate artifacts (DOCSATHI_DUMP_DIR)

#[cfg(test)]
mod scenario_tests;

pub use masking::*;
pub use normalize::*;
pub use validation::*;
pub use fhir::*;
pub use orchestrator::*;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("LLM provider is not reachable at {0}")]
    Connection(String),

    #[error("LLM provider returned error (status {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("No JSON object could be recovered: {0}")]
    JsonRecovery(String),

    #[error("Structured output does not match the note schema: {0}")]
    Coercion(String),

    #[error("Unable to parse LLM output into structured JSON: {0}")]
    Unparseable(String),

    #[error("Cannot read note from {source_name}: {error}")]
    Input {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    #[error("Cannot serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What a caller can do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Actionable by the operator (credentials, endpoint URL).
    Configuration,
    /// Provider or network trouble; re-invoking may succeed.
    Transient,
    /// The model output could not be turned into a structured note.
    Unparseable,
    /// Local input or output failed (unreadable note file, stdin, output).
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Transient => "transient",
            ErrorKind::Unparseable => "unparseable",
            ErrorKind::Io => "io",
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Configuration(_) => ErrorKind::Configuration,
            PipelineError::Connection(_)
            | PipelineError::Provider { .. }
            | PipelineError::HttpClient(_)
            | PipelineError::MalformedResponse(_) => ErrorKind::Transient,
            PipelineError::JsonRecovery(_)
            | PipelineError::Coercion(_)
            | PipelineError::Unparseable(_) => ErrorKind::Unparseable,
            PipelineError::Input { .. } | PipelineError::Serialization(_) => ErrorKind::Io,
        }
    }

    /// Only transport-level failures are worth another identical request.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
