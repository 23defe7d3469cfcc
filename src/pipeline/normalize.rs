// Deterministic, idempotent clean-up of a coerced note. Rules are independent;
// a rule that cannot parse its input leaves the field untouched.

use super::extraction::types::{Medication, Scalar, StructuredNote, Vitals};

/// Prescription shorthand → plain frequency. Keys are matched case-insensitively.
const FREQUENCY_ABBREVIATIONS: &[(&str, &str)] = &[
    ("OD", "once daily"),
    ("BD", "twice daily"),
    ("TID", "three times daily"),
    ("SOS", "as needed"),
    ("PRN", "as needed"),
];

/// Normalize a structured note in place.
pub fn normalize_structured(note: &mut StructuredNote) {
    if let Some(vitals) = note.vitals.as_mut() {
        split_blood_pressure(vitals);
        normalize_temperature(vitals);
        normalize_spo2(vitals);
    }
    if let Some(medications) = note.medications.as_mut() {
        medications.iter_mut().for_each(normalize_medication);
    }
}

/// `"120/80"` in `bp_systolic` becomes systolic 120, diastolic 80. A lone
/// integer such as `"120"` becomes systolic 120 and leaves diastolic alone.
pub fn split_blood_pressure(vitals: &mut Vitals) {
    let Some(text) = vitals.bp_systolic.as_ref().and_then(Scalar::as_text) else {
        return;
    };
    if let Some((systolic, diastolic)) = parse_bp_pair(text) {
        vitals.bp_systolic = Some(Scalar::from(systolic));
        vitals.bp_diastolic = Some(diastolic);
    } else if let Ok(systolic) = text.trim().parse::<i64>() {
        vitals.bp_systolic = Some(Scalar::from(systolic));
    }
}

fn parse_bp_pair(text: &str) -> Option<(i64, i64)> {
    let (systolic, diastolic) = text.split_once('/')?;
    Some((systolic.trim().parse().ok()?, diastolic.trim().parse().ok()?))
}

/// Temperature is always kept as text, in whatever format it arrived.
fn normalize_temperature(vitals: &mut Vitals) {
    if let Some(temp @ Scalar::Number(_)) = vitals.temp.as_ref() {
        vitals.temp = Some(Scalar::Text(temp.to_string()));
    }
}

/// `"98%"` becomes 98.0; unparseable text is left alone.
fn normalize_spo2(vitals: &mut Vitals) {
    let normalized = match vitals.spo2.as_ref() {
        Some(Scalar::Text(text)) => {
            let digits = text.trim();
            let digits = digits.strip_suffix('%').unwrap_or(digits).trim();
            match digits.parse::<f64>() {
                Ok(value) if value.is_finite() => Scalar::float(value),
                _ => return,
            }
        }
        Some(Scalar::Number(n)) if !n.is_f64() => match n.as_f64() {
            Some(value) => Scalar::float(value),
            None => return,
        },
        _ => return,
    };
    vitals.spo2 = Some(normalized);
}

pub fn normalize_medication(medication: &mut Medication) {
    if let Some(dose @ Scalar::Number(_)) = medication.dose.as_ref() {
        medication.dose = Some(Scalar::Text(dose.to_string()));
    }
    if let Some(frequency) = medication.frequency.as_deref() {
        if let Some(expanded) = expand_frequency(frequency) {
            medication.frequency = Some(expanded.to_string());
        }
    }
}

/// Expansion for a known abbreviation; `None` leaves the value as written.
pub fn expand_frequency(frequency: &str) -> Option<&'static str> {
    let key = frequency.trim();
    FREQUENCY_ABBREVIATIONS
        .iter()
        .find(|(abbreviation, _)| abbreviation.eq_ignore_ascii_case(key))
        .map(|(_, expanded)| *expanded)
}
