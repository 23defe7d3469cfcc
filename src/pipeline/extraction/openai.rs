use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{GenerationRequest, LlmClient};
use super::validate_base_url;
use crate::pipeline::PipelineError;

/// Client for OpenAI-compatible chat completion endpoints.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiClient {
    /// Fails fast on a missing key or malformed URL; neither is retried.
    pub fn new(api_key: &str, base_url: &str, timeout_secs: u64) -> Result<Self, PipelineError> {
        if api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "OPENAI_API_KEY missing. Set it in the environment to enable LLM calls.".into(),
            ));
        }
        let base_url = validate_base_url(base_url)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PipelineError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            api_key: api_key.trim().to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl LlmClient for OpenAiClient {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, PipelineError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: request.model,
            messages: [ChatMessage {
                role: "user",
                content: request.prompt,
            }],
            top_p: 1.0,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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
        parse_chat_response(&body)
    }

    fn provider(&self) -> &'static str {
        "openai"
    }
}

/// Content of the first choice in a chat completion body.
fn parse_chat_response(body: &str) -> Result<String, PipelineError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| PipelineError::MalformedResponse(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| PipelineError::MalformedResponse("response has no message content".into()))
}
