//! Minimal FHIR-like document bundle built from a structured note.
//!
//! The bundle is a read-only projection: it is rebuilt in full after every
//! run or edit and never patched. No validation happens here.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::extraction::types::{Medication, Scalar, StructuredNote, Vitals};

pub const PLACEHOLDER_PATIENT_ID: &str = "deidentified";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    #[serde(rename = "type")]
    pub bundle_type: String,
    pub timestamp: String,
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    /// Number of entries holding the given resource type.
    pub fn count_of(&self, resource_type: &str) -> usize {
        self.entry
            .iter()
            .filter(|e| e.resource.resource_type() == resource_type)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub resource: Resource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Patient {
        id: String,
        meta: PatientMeta,
    },
    Encounter {
        status: String,
        period: Period,
    },
    Observation {
        code: CodeText,
        value: Scalar,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
        timestamp: String,
    },
    Condition {
        code: CodeText,
    },
    MedicationStatement {
        medication: CodeText,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dosage: Option<Dosage>,
    },
    ServiceRequest {
        code: CodeText,
    },
}

impl Resource {
    pub fn resource_type(&self) -> &'static str {
        match self {
            Resource::Patient { .. } => "Patient",
            Resource::Encounter { .. } => "Encounter",
            Resource::Observation { .. } => "Observation",
            Resource::Condition { .. } => "Condition",
            Resource::MedicationStatement { .. } => "MedicationStatement",
            Resource::ServiceRequest { .. } => "ServiceRequest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeText {
    pub text: String,
}

impl CodeText {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientMeta {
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dosage {
    pub dose: Scalar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// Build the bundle stamped with the current UTC time.
pub fn build_fhir_bundle(note: &StructuredNote) -> Bundle {
    build_fhir_bundle_at(note, Utc::now())
}

/// Build the bundle with a fixed timestamp.
///
/// Entry order: Patient, Encounter, Observations (systolic, diastolic, heart
/// rate, SpO2, temperature), Conditions, MedicationStatements, ServiceRequests.
pub fn build_fhir_bundle_at(note: &StructuredNote, at: DateTime<Utc>) -> Bundle {
    let timestamp = at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut resources = vec![
        Resource::Patient {
            id: PLACEHOLDER_PATIENT_ID.to_string(),
            meta: PatientMeta {
                note: "de-identified placeholder".to_string(),
            },
        },
        Resource::Encounter {
            status: "finished".to_string(),
            period: Period {
                start: timestamp.clone(),
            },
        },
    ];

    if let Some(vitals) = note.vitals.as_ref() {
        resources.extend(vital_observations(vitals, &timestamp));
    }
    resources.extend(note.diagnoses().iter().map(|d| Resource::Condition {
        code: CodeText::new(d),
    }));
    resources.extend(note.medications().iter().map(medication_statement));
    resources.extend(note.tests().iter().map(|t| Resource::ServiceRequest {
        code: CodeText::new(t),
    }));

    tracing::debug!(entries = resources.len(), "Bundle built");

    Bundle {
        resource_type: "Bundle".to_string(),
        bundle_type: "document".to_string(),
        timestamp,
        entry: resources
            .into_iter()
            .map(|resource| BundleEntry { resource })
            .collect(),
    }
}

fn vital_observations(vitals: &Vitals, timestamp: &str) -> Vec<Resource> {
    let readings: [(&str, Option<Scalar>, Option<&str>); 5] = [
        ("blood pressure systolic", vitals.bp_systolic.clone(), Some("mmHg")),
        ("blood pressure diastolic", vitals.bp_diastolic.map(Scalar::from), Some("mmHg")),
        ("heart rate", vitals.hr.map(Scalar::from), Some("bpm")),
        ("spo2", vitals.spo2.clone(), Some("%")),
        ("temperature", vitals.temp.clone(), None),
    ];

    readings
        .into_iter()
        .filter_map(|(code, value, unit)| {
            value.map(|value| Resource::Observation {
                code: CodeText::new(code),
                value,
                unit: unit.map(str::to_string),
                timestamp: timestamp.to_string(),
            })
        })
        .collect()
}

fn medication_statement(medication: &Medication) -> Resource {
    let dosage = medication
        .dose
        .as_ref()
        .filter(|dose| !dose.is_blank())
        .map(|dose| Dosage {
            dose: dose.clone(),
            route: medication.route.clone(),
            frequency: medication.frequency.clone(),
            duration: medication.duration.clone(),
        });

    Resource::MedicationStatement {
        medication: CodeText::new(&medication.name),
        dosage,
    }
}
