// Map recovered JSON onto StructuredNote with lenient typing.
// Recognized keys are checked strictly, unknown keys are ignored.

use serde::Deserialize;
use serde_json::Value;

use super::types::{Medication, Scalar, StructuredNote, Vitals};
use crate::pipeline::PipelineError;

#[derive(Deserialize)]
struct RawNote {
    complaints: Option<Value>,
    duration: Option<Value>,
    vitals: Option<Value>,
    findings: Option<Value>,
    diagnosis: Option<Value>,
    medications: Option<Value>,
    tests: Option<Value>,
    advice: Option<Value>,
    follow_up: Option<Value>,
    flags: Option<Value>,
}

#[derive(Deserialize)]
struct RawVitals {
    bp_systolic: Option<Value>,
    bp_diastolic: Option<Value>,
    hr: Option<Value>,
    spo2: Option<Value>,
    temp: Option<Value>,
}

#[derive(Deserialize)]
struct RawMedication {
    name: Option<Value>,
    dose: Option<Value>,
    route: Option<Value>,
    frequency: Option<Value>,
    duration: Option<Value>,
    prn: Option<Value>,
}

/// Coerce a recovered JSON object into a `StructuredNote`.
///
/// Numbers and strings are accepted interchangeably where no information is
/// lost. Fails when a medication has no name or a field has an impossible
/// shape (e.g. an object where text is expected).
pub fn coerce_structured_note(value: &Value) -> Result<StructuredNote, PipelineError> {
    if !value.is_object() {
        return Err(PipelineError::Coercion("top-level value is not an object".into()));
    }
    let raw: RawNote = serde_json::from_value(value.clone())
        .map_err(|e| PipelineError::Coercion(e.to_string()))?;

    let medications = match raw.medications {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| coerce_medication(i, item))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Some(other) => {
            return Err(PipelineError::Coercion(format!(
                "medications must be a list, got {}",
                type_name(&other)
            )))
        }
    };

    Ok(StructuredNote {
        complaints: text_list("complaints", raw.complaints)?,
        duration: text("duration", raw.duration)?,
        vitals: coerce_vitals(raw.vitals)?,
        findings: text("findings", raw.findings)?,
        diagnosis: text_list("diagnosis", raw.diagnosis)?,
        medications,
        tests: text_list("tests", raw.tests)?,
        advice: text("advice", raw.advice)?,
        follow_up: text("follow_up", raw.follow_up)?,
        flags: text_list("flags", raw.flags)?.unwrap_or_default(),
    })
}

fn coerce_vitals(value: Option<Value>) -> Result<Option<Vitals>, PipelineError> {
    let value = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(v @ Value::Object(_)) => v,
        Some(other) => {
            return Err(PipelineError::Coercion(format!(
                "vitals must be an object, got {}",
                type_name(&other)
            )))
        }
    };
    let raw: RawVitals =
        serde_json::from_value(value).map_err(|e| PipelineError::Coercion(e.to_string()))?;

    Ok(Some(Vitals {
        bp_systolic: scalar("vitals.bp_systolic", raw.bp_systolic)?,
        bp_diastolic: integer("vitals.bp_diastolic", raw.bp_diastolic)?,
        hr: integer("vitals.hr", raw.hr)?,
        spo2: scalar("vitals.spo2", raw.spo2)?,
        temp: scalar("vitals.temp", raw.temp)?,
    }))
}

fn coerce_medication(index: usize, value: &Value) -> Result<Medication, PipelineError> {
    if !value.is_object() {
        return Err(PipelineError::Coercion(format!(
            "medications[{index}] must be an object, got {}",
            type_name(value)
        )));
    }
    let raw: RawMedication = serde_json::from_value(value.clone())
        .map_err(|e| PipelineError::Coercion(e.to_string()))?;

    let name = match raw.name {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => {
            return Err(PipelineError::Coercion(format!(
                "medications[{index}] is missing a name"
            )))
        }
    };

    Ok(Medication {
        name,
        dose: scalar("medication.dose", raw.dose)?,
        route: text("medication.route", raw.route)?,
        frequency: text("medication.frequency", raw.frequency)?,
        duration: text("medication.duration", raw.duration)?,
        prn: flag(raw.prn),
    })
}

/// Free text; numbers and booleans become their text form.
fn text(field: &str, value: Option<Value>) -> Result<Option<String>, PipelineError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(shape_error(field, "text", &other)),
    }
}

/// List of text; a single string is treated as a one-item list.
fn text_list(field: &str, value: Option<Value>) -> Result<Option<Vec<String>>, PipelineError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(vec![s])),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Null => {}
                    Value::String(s) => out.push(s),
                    Value::Number(n) => out.push(n.to_string()),
                    other => return Err(shape_error(field, "a list of text", &other)),
                }
            }
            Ok(Some(out))
        }
        Some(other) => Err(shape_error(field, "a list of text", &other)),
    }
}

fn scalar(field: &str, value: Option<Value>) -> Result<Option<Scalar>, PipelineError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(Scalar::Number(n))),
        Some(Value::String(s)) => Ok(Some(Scalar::Text(s))),
        Some(other) => Err(shape_error(field, "a number or text", &other)),
    }
}

/// Whole number; integral floats and numeric strings are accepted.
fn integer(field: &str, value: Option<Value>) -> Result<Option<i64>, PipelineError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                _ => Err(PipelineError::Coercion(format!(
                    "{field} must be a whole number, got {n}"
                ))),
            }
        }
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| {
            PipelineError::Coercion(format!("{field} must be a whole number, got {s:?}"))
        }),
        Some(other) => Err(shape_error(field, "a whole number", &other)),
    }
}

/// PRN marker. Unrecognized encodings are dropped rather than failing the note.
fn flag(value: Option<Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => parse_truthy(&s),
        _ => None,
    }
}

/// Textual truthy/falsy encodings seen in prescriptions.
pub fn parse_truthy(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "prn" | "sos" | "as needed" | "yes" | "y" | "true" | "t" | "1" => Some(true),
        "no" | "n" | "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn shape_error(field: &str, expected: &str, got: &Value) -> PipelineError {
    PipelineError::Coercion(format!("{field} must be {expected}, got {}", type_name(got)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
