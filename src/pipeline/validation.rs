use serde::{Deserialize, Serialize};

use super::extraction::types::{Medication, StructuredNote};

/// Explicit diagnosis markers, matched case-insensitively in the unmasked note.
pub const DIAGNOSIS_MARKERS: &[&str] = &["dx:", "diagnosis:"];

pub const FLAG_DIAGNOSIS_NOT_DOCUMENTED: &str = "Diagnosis not documented (not inferred)";
pub const FLAG_DIAGNOSIS_SECTION_EMPTY: &str = "Diagnosis section absent or empty";

/// Ordered, append-only list of flag strings. Exact duplicates are dropped,
/// first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags(Vec<String>);

impl Flags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the flag was already present.
    pub fn push(&mut self, flag: impl Into<String>) -> bool {
        let flag = flag.into();
        if self.0.contains(&flag) {
            return false;
        }
        self.0.push(flag);
        true
    }

    pub fn extend<I, S>(&mut self, flags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for flag in flags {
            self.push(flag);
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<S: Into<String>> FromIterator<S> for Flags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut flags = Flags::new();
        flags.extend(iter);
        flags
    }
}

/// Completeness checks on a structured note. Only absences are flagged;
/// extracted values are never second-guessed. The note is not modified.
pub fn run_validations(note: &StructuredNote, original_note: &str) -> Vec<String> {
    let mut flags = Flags::new();

    if note.diagnoses().iter().all(|d| d.trim().is_empty()) {
        if has_diagnosis_marker(original_note) {
            flags.push(FLAG_DIAGNOSIS_SECTION_EMPTY);
        } else {
            flags.push(FLAG_DIAGNOSIS_NOT_DOCUMENTED);
        }
    }

    for medication in note.medications() {
        if let Some(flag) = medication_gap_flag(medication) {
            flags.push(flag);
        }
    }

    flags.into_vec()
}

/// Whether the source note carries an explicit diagnosis marker.
///
/// Must be given the unmasked note: a marker next to a redacted span could
/// otherwise be lost.
pub fn has_diagnosis_marker(original_note: &str) -> bool {
    let lowered = original_note.to_lowercase();
    DIAGNOSIS_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// `"Medication 'X' missing: dose, frequency"` listing exactly the absent
/// sub-fields, or `None` when the prescription is complete.
pub fn medication_gap_flag(medication: &Medication) -> Option<String> {
    let missing = missing_medication_fields(medication);
    if missing.is_empty() {
        return None;
    }
    Some(format!(
        "Medication '{}' missing: {}",
        medication.name,
        missing.join(", ")
    ))
}

fn missing_medication_fields(medication: &Medication) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if medication.dose.as_ref().map_or(true, |d| d.is_blank()) {
        missing.push("dose");
    }
    if is_blank(medication.frequency.as_deref()) {
        missing.push("frequency");
    }
    if is_blank(medication.duration.as_deref()) {
        missing.push("duration");
    }
    missing
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
