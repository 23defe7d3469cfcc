//! Opt-in dump of intermediate pipeline artifacts.
//!
//! Enabled by setting `DOCSATHI_DUMP_DIR` (read once into `AppConfig`).
//! Disabled otherwise. The unmasked note is never written.
//!
//! **Output structure**:
//! ```text
//! {dump_dir}/{run_id}/
//!   01-masked-note.txt
//!   02-llm-response.txt
//!   03-recovered.json
//!   04-result.json
//! ```

use std::path::{Path, PathBuf};

use uuid::Uuid;

pub const MASKED_NOTE_FILE: &str = "01-masked-note.txt";
pub const LLM_RESPONSE_FILE: &str = "02-llm-response.txt";
pub const RECOVERED_JSON_FILE: &str = "03-recovered.json";
pub const RESULT_FILE: &str = "04-result.json";

// ──────────────────────────────────────────────
// Dump directory resolution
// ──────────────────────────────────────────────

/// Returns the dump directory for a run, or `None` if diagnostics are disabled.
///
/// Creates the directory tree on first call. Returns `None` (with a warning) if
/// directory creation fails. Never blocks the pipeline.
pub fn dump_dir_for(base: Option<&Path>, run_id: &Uuid) -> Option<PathBuf> {
    let dir = base?.join(run_id.to_string());

    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(
            path = %dir.display(),
            error = %e,
            "Diagnostic dump: failed to create directory"
        );
        return None;
    }

    Some(dir)
}

// ──────────────────────────────────────────────
// Dump writers
// ──────────────────────────────────────────────

/// Write a JSON artifact, pretty-printed. Never panics.
pub fn dump_json<T: serde::Serialize>(dir: &Path, filename: &str, value: &T) {
    let path = dir.join(filename);
    match serde_json::to_string_pretty(value) {
        Ok(json) => write_artifact(&path, json.as_bytes(), "JSON"),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Diagnostic dump: failed to serialize JSON"
        ),
    }
}

/// Write a text artifact (masked note, raw model response). Never panics.
pub fn dump_text(dir: &Path, filename: &str, text: &str) {
    write_artifact(&dir.join(filename), text.as_bytes(), "text");
}

fn write_artifact(path: &Path, data: &[u8], kind: &str) {
    match std::fs::write(path, data) {
        Ok(()) => tracing::debug!(
            path = %path.display(),
            size = data.len(),
            kind,
            "Diagnostic dump: artifact written"
        ),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            kind,
            "Diagnostic dump: failed to write artifact"
        ),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
