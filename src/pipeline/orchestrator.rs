//! Pipeline orchestrator: Mask → Extract → Coerce → Normalize+Validate → Build.
//!
//! Each stage's failure aborts the remaining ones; nothing partial is returned.

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::diagnostic;
use super::extraction::types::{LlmClient, StructuredNote};
use super::extraction::{build_client, coerce_structured_note, ExtractionRequester};
use super::fhir::{build_fhir_bundle, Bundle};
use super::masking::mask_pii;
use super::normalize::normalize_structured;
use super::validation::{run_validations, Flags};
use super::PipelineError;
use crate::config::AppConfig;

/// Per-call options. `model` and `base_url` override the configured values.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Ask the provider for deterministic sampling.
    pub strict_mode: bool,
}

impl PipelineOptions {
    pub fn temperature(&self) -> Option<f32> {
        self.strict_mode.then_some(0.0)
    }
}

/// Composite result of one successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub structured: StructuredNote,
    pub bundle: Bundle,
    pub flags: Vec<String>,
    pub masked_note: String,
    /// Recovered model JSON, before coercion.
    pub raw_llm_json: Value,
    /// Raw text of the model response that produced `raw_llm_json`.
    pub raw_llm_text: String,
    pub repaired: bool,
}

/// Result of re-applying normalization and validation to an edited note.
#[derive(Debug, Clone, Serialize)]
pub struct EditOutcome {
    pub structured: StructuredNote,
    pub flags: Vec<String>,
    pub bundle: Bundle,
}

/// Run the full pipeline on one raw note.
///
/// `llm` replaces the configured provider client (tests, offline demos).
/// Only the masked note ever reaches the model.
pub fn run_pipeline(
    note: &str,
    options: &PipelineOptions,
    config: &AppConfig,
    llm: Option<&dyn LlmClient>,
) -> Result<PipelineResult, PipelineError> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run_pipeline", run_id = %run_id);
    let _guard = span.enter();
    let start = Instant::now();
    let dump_dir = diagnostic::dump_dir_for(config.dump_dir.as_deref(), &run_id);

    // Stage 1: mask
    let (masked_note, pii_flags) = mask_pii(note);
    tracing::debug!(
        note_len = note.len(),
        pii_categories = pii_flags.len(),
        "Stage 1: note masked"
    );
    if let Some(dir) = dump_dir.as_deref() {
        diagnostic::dump_text(dir, diagnostic::MASKED_NOTE_FILE, &masked_note);
    }

    // Stage 2: extract
    let owned_client;
    let llm: &dyn LlmClient = match llm {
        Some(client) => client,
        None => {
            owned_client = build_client(config, options.base_url.as_deref())?;
            owned_client.as_ref()
        }
    };
    let model = options.model.as_deref().unwrap_or_else(|| config.model());
    let requester = ExtractionRequester::new(llm, model).with_temperature(options.temperature());

    let mut extraction = requester.extract_structured(&masked_note)?;
    tracing::debug!(
        provider = llm.provider(),
        model,
        repaired = extraction.repaired,
        "Stage 2: JSON recovered"
    );
    if let Some(dir) = dump_dir.as_deref() {
        diagnostic::dump_text(dir, diagnostic::LLM_RESPONSE_FILE, &extraction.raw_text);
        diagnostic::dump_json(dir, diagnostic::RECOVERED_JSON_FILE, &extraction.json);
    }

    // Stage 3: coerce, with one repair round-trip if none has happened yet
    let mut structured = match coerce_structured_note(&extraction.json) {
        Ok(structured) => structured,
        Err(e) if !extraction.repaired => {
            tracing::warn!(error = %e, "Recovered JSON does not fit the note schema, requesting repair");
            extraction = requester.repair_json(&extraction.json.to_string())?;
            if let Some(dir) = dump_dir.as_deref() {
                diagnostic::dump_text(dir, diagnostic::LLM_RESPONSE_FILE, &extraction.raw_text);
                diagnostic::dump_json(dir, diagnostic::RECOVERED_JSON_FILE, &extraction.json);
            }
            coerce_structured_note(&extraction.json)
                .map_err(|e| PipelineError::Unparseable(e.to_string()))?
        }
        Err(e) => return Err(PipelineError::Unparseable(e.to_string())),
    };
    tracing::debug!(
        medications = structured.medications().len(),
        diagnoses = structured.diagnoses().len(),
        "Stage 3: note coerced"
    );

    // Stage 4: normalize + validate. Flags supplied by the model are discarded.
    structured.flags.clear();
    normalize_structured(&mut structured);
    let validator_flags = run_validations(&structured, note);
    let flags = merge_flags(&pii_flags, &validator_flags);
    structured.flags = flags.clone();

    // Stage 5: bundle
    let bundle = build_fhir_bundle(&structured);

    let result = PipelineResult {
        structured,
        bundle,
        flags,
        masked_note,
        raw_llm_json: extraction.json,
        raw_llm_text: extraction.raw_text,
        repaired: extraction.repaired,
    };

    if let Some(dir) = dump_dir.as_deref() {
        diagnostic::dump_json(dir, diagnostic::RESULT_FILE, &result);
    }

    tracing::info!(
        flags = result.flags.len(),
        bundle_entries = result.bundle.entry.len(),
        repaired = result.repaired,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Pipeline complete"
    );

    Ok(result)
}

/// Re-run normalization and validation on a user-edited note and rebuild the
/// bundle. `base_flags` are the masking flags of the original run.
pub fn apply_edits(
    mut structured: StructuredNote,
    original_note: &str,
    base_flags: &[String],
) -> EditOutcome {
    normalize_structured(&mut structured);
    let validator_flags = run_validations(&structured, original_note);
    let flags = merge_flags(base_flags, &validator_flags);
    structured.flags = flags.clone();
    let bundle = build_fhir_bundle(&structured);

    tracing::debug!(flags = flags.len(), "Edits applied");

    EditOutcome {
        structured,
        flags,
        bundle,
    }
}

/// Masking flags followed by validator flags, first occurrence wins.
pub fn merge_flags(masking: &[String], validation: &[String]) -> Vec<String> {
    let mut flags = Flags::new();
    flags.extend(masking.iter().cloned());
    flags.extend(validation.iter().cloned());
    flags.into_vec()
}
