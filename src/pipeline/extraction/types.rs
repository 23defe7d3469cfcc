use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineError;

/// A model field that may arrive as a number or as text.
///
/// Numbers keep their original JSON form (`37` vs `37.0`), so converting to
/// text later preserves whatever format the model produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Number(n) => n.as_i64(),
            Scalar::Text(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => n.as_f64(),
            Scalar::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            Scalar::Number(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Scalar::Text(_))
    }

    /// Blank text counts as absent for completeness checks.
    pub fn is_blank(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.trim().is_empty())
    }

    /// Float from an `f64`; non-finite values fall back to text.
    pub fn float(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(Scalar::Number)
            .unwrap_or_else(|| Scalar::Text(value.to_string()))
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value.into())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

/// Vital signs as extracted. See `normalize` for the canonical forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// May hold `"120/80"` until normalization splits it.
    pub bp_systolic: Option<Scalar>,
    pub bp_diastolic: Option<i64>,
    pub hr: Option<i64>,
    /// Percentage; `"98%"` is accepted and parsed during normalization.
    pub spo2: Option<Scalar>,
    /// Always text once normalized.
    pub temp: Option<Scalar>,
}

/// One prescribed medication. Owned by the note that lists it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    /// Text once normalized, even if the model supplied a number.
    pub dose: Option<Scalar>,
    pub route: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub prn: Option<bool>,
}

impl Medication {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// Canonical structured record for one outpatient note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredNote {
    /// In order of appearance in the note.
    pub complaints: Option<Vec<String>>,
    pub duration: Option<String>,
    pub vitals: Option<Vitals>,
    pub findings: Option<String>,
    /// Only diagnoses written explicitly in the source; never inferred.
    pub diagnosis: Option<Vec<String>>,
    pub medications: Option<Vec<Medication>>,
    pub tests: Option<Vec<String>>,
    pub advice: Option<String>,
    pub follow_up: Option<String>,
    /// Masking flags followed by validator flags, deduplicated.
    #[serde(default)]
    pub flags: Vec<String>,
}

impl StructuredNote {
    pub fn diagnoses(&self) -> &[String] {
        self.diagnosis.as_deref().unwrap_or_default()
    }

    pub fn medications(&self) -> &[Medication] {
        self.medications.as_deref().unwrap_or_default()
    }

    pub fn tests(&self) -> &[String] {
        self.tests.as_deref().unwrap_or_default()
    }
}

/// One text-generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    /// `None` leaves sampling at the provider default.
    pub temperature: Option<f32>,
}

/// Text-generation capability. Pipeline stages never branch on the provider.
pub trait LlmClient {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, PipelineError>;

    /// Short provider name for logs.
    fn provider(&self) -> &'static str;
}
