pub mod types;
pub mod prompt;
pub mod retry;
pub mod parser;
pub mod coerce;
pub mod ollama;
pub mod openai;
pub mod requester;

pub use types::*;
pub use prompt::*;
pub use retry::*;
pub use parser::*;
pub use coerce::*;
pub use ollama::*;
pub use openai::*;
pub use requester::*;

use crate::config::{AppConfig, Provider};
use crate::pipeline::PipelineError;

/// Check that an endpoint is an absolute http(s) URL. Returns it without a
/// trailing slash.
pub fn validate_base_url(url: &str) -> Result<String, PipelineError> {
    let trimmed = url.trim();
    let parsed = reqwest::Url::parse(trimmed).map_err(|e| {
        PipelineError::Configuration(format!(
            "base URL {trimmed:?} is not a valid URL ({e}); use a full URL such as 'https://api.openai.com/v1'"
        ))
    })?;

    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(trimmed.trim_end_matches('/').to_string()),
        _ => Err(PipelineError::Configuration(format!(
            "base URL {trimmed:?} must start with http:// or https://"
        ))),
    }
}

/// Build the configured provider client. `base_url` overrides the configured
/// endpoint for this client only.
pub fn build_client(
    config: &AppConfig,
    base_url: Option<&str>,
) -> Result<Box<dyn LlmClient + Send + Sync>, PipelineError> {
    if !config.has_credentials() {
        return Err(PipelineError::Configuration(
            "OPENAI_API_KEY missing. Set it in the environment or .env, \
             or set DOCSATHI_PROVIDER=ollama to use a local model."
                .into(),
        ));
    }

    let base_url = base_url.unwrap_or_else(|| config.base_url());
    match config.provider {
        Provider::OpenAi => {
            let api_key = config.openai_api_key.as_deref().unwrap_or_default();
            Ok(Box::new(OpenAiClient::new(
                api_key,
                base_url,
                config.timeout_secs,
            )?))
        }
        Provider::Ollama => Ok(Box::new(OllamaClient::new(base_url, config.timeout_secs)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert_eq!(
            validate_base_url("https://api.openai.com/v1/").unwrap(),
            "https://api.openai.com/v1"
        );
        assert_eq!(
            validate_base_url("http://127.0.0.1:11434").unwrap(),
            "http://127.0.0.1:11434"
        );
    }

    #[test]
    fn rejects_missing_protocol() {
        assert!(matches!(
            validate_base_url("api.openai.com/v1"),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            validate_base_url("ftp://example.com"),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn openai_without_key_fails_at_construction() {
        let config = AppConfig::default();
        let err = build_client(&config, None).err().unwrap();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(err.to_string().contains("DOCSATHI_PROVIDER=ollama"), "{err}");
    }

    #[test]
    fn openai_with_key_builds() {
        let config = AppConfig {
            openai_api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let client = build_client(&config, None).unwrap();
        assert_eq!(client.provider(), "openai");
    }

    #[test]
    fn ollama_builds_without_key() {
        let config = AppConfig {
            provider: Provider::Ollama,
            ..AppConfig::default()
        };
        let client = build_client(&config, None).unwrap();
        assert_eq!(client.provider(), "ollama");
    }

    #[test]
    fn base_url_override_is_validated() {
        let config = AppConfig {
            provider: Provider::Ollama,
            ..AppConfig::default()
        };
        let result = build_client(&config, Some("not a url"));
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }
}
