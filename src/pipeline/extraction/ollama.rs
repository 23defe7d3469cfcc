use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{GenerationRequest, LlmClient};
use super::validate_base_url;
use crate::pipeline::PipelineError;

/// Ollama HTTP client for local-model extraction.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a client for an Ollama instance. Fails on a malformed URL.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, PipelineError> {
        let base_url = validate_base_url(base_url)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PipelineError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            client,
            timeout_secs,
        })
    }

    /// Default Ollama instance at localhost:11434.
    pub fn default_local(timeout_secs: u64) -> Result<Self, PipelineError> {
        Self::new("http://localhost:11434", timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl LlmClient for OllamaClient {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, PipelineError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: request.model,
            prompt: request.prompt,
            stream: false,
            options: request
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    PipelineError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    PipelineError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    PipelineError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .map_err(|e| PipelineError::MalformedResponse(e.to_string()))?;
        parse_generate_response(&body)
    }

    fn provider(&self) -> &'static str {
        "ollama"
    }
}

/// Pull the generated text out of an /api/generate response body.
fn parse_generate_response(body: &str) -> Result<String, PipelineError> {
    let parsed: OllamaGenerateResponse =
        serde_json::from_str(body).map_err(|e| PipelineError::MalformedResponse(e.to_string()))?;
    Ok(parsed.response)
}

/// Scripted LLM client for tests and offline runs.
///
/// Returns the configured responses in order, repeating the last one.
pub struct MockLlmClient {
    responses: Vec<Result<String, String>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self::with_responses(&[response])
    }

    pub fn with_responses(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|r| Ok(r.to_string())).collect(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a transport failure before the scripted responses.
    pub fn failing_first(mut self, failures: usize, message: &str) -> Self {
        let mut scripted: Vec<Result<String, String>> =
            (0..failures).map(|_| Err(message.to_string())).collect();
        scripted.append(&mut self.responses);
        self.responses = scripted;
        self
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<String>> {
        self.prompts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn call_count(&self) -> usize {
        self.recorded().len()
    }

    /// Every prompt this client was asked to complete, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.recorded().clone()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, PipelineError> {
        let index = {
            let mut prompts = self.recorded();
            prompts.push(request.prompt.to_string());
            prompts.len() - 1
        };
        let scripted = self
            .responses
            .get(index)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_else(|| Ok(String::new()));
        scripted.map_err(PipelineError::HttpClient)
    }

    fn provider(&self) -> &'static str {
        "mock"
    }
}
