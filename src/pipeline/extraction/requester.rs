use serde_json::Value;

use super::parser::recover_json;
use super::prompt::{build_extraction_prompt, build_repair_prompt};
use super::retry::{retry_with_backoff, RetryPolicy};
use super::types::{GenerationRequest, LlmClient};
use crate::pipeline::PipelineError;

/// What the model returned for one note.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutput {
    /// Recovered JSON object, before schema coercion.
    pub json: Value,
    /// Raw text of the response that produced `json`.
    pub raw_text: String,
    /// Whether the repair round-trip was needed.
    pub repaired: bool,
}

/// Sends masked notes to a text-generation capability and recovers JSON.
pub struct ExtractionRequester<'a> {
    llm: &'a dyn LlmClient,
    model: String,
    temperature: Option<f32>,
    extraction_policy: RetryPolicy,
    repair_policy: RetryPolicy,
}

impl<'a> ExtractionRequester<'a> {
    pub fn new(llm: &'a dyn LlmClient, model: &str) -> Self {
        Self {
            llm,
            model: model.to_string(),
            temperature: None,
            extraction_policy: RetryPolicy::extraction(),
            repair_policy: RetryPolicy::repair(),
        }
    }

    /// Ask the provider for deterministic sampling.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retry_policies(mut self, extraction: RetryPolicy, repair: RetryPolicy) -> Self {
        self.extraction_policy = extraction;
        self.repair_policy = repair;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Extract a JSON object from a masked note.
    ///
    /// Unrecoverable output gets exactly one repair round-trip; if that also
    /// yields nothing parseable the call fails with `Unparseable`.
    pub fn extract_structured(&self, masked_note: &str) -> Result<ExtractionOutput, PipelineError> {
        let prompt = build_extraction_prompt(masked_note);
        let raw_text = self.call(&prompt, &self.extraction_policy, "extract")?;
        tracing::info!(
            provider = self.llm.provider(),
            response_len = raw_text.len(),
            "LLM raw response captured"
        );

        match recover_json(&raw_text) {
            Ok(json) => Ok(ExtractionOutput {
                json,
                raw_text,
                repaired: false,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "LLM response not parseable, requesting repair");
                self.repair_json(&raw_text)
            }
        }
    }

    /// Single repair round-trip: reformat `broken_output` into schema JSON.
    pub fn repair_json(&self, broken_output: &str) -> Result<ExtractionOutput, PipelineError> {
        let prompt = build_repair_prompt(broken_output);
        let raw_text = self.call(&prompt, &self.repair_policy, "repair")?;

        match recover_json(&raw_text) {
            Ok(json) => Ok(ExtractionOutput {
                json,
                raw_text,
                repaired: true,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Repair output not parseable");
                Err(PipelineError::Unparseable(format!(
                    "repair round-trip did not yield JSON ({e})"
                )))
            }
        }
    }

    fn call(
        &self,
        prompt: &str,
        policy: &RetryPolicy,
        operation: &str,
    ) -> Result<String, PipelineError> {
        let request = GenerationRequest {
            model: &self.model,
            prompt,
            temperature: self.temperature,
        };
        retry_with_backoff(policy, operation, || self.llm.generate(&request))
    }
}
