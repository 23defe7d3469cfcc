/// JSON skeleton shared by the extraction and repair instructions.
pub const NOTE_SCHEMA: &str = r#"{
  "complaints": [],
  "duration": null,
  "vitals": {
    "bp_systolic": null,
    "bp_diastolic": null,
    "hr": null,
    "spo2": null,
    "temp": null
  },
  "findings": null,
  "diagnosis": [],
  "medications": [],
  "tests": [],
  "advice": null,
  "follow_up": null,
  "flags": []
}"#;

/// Shape of each entry in `medications`.
pub const MEDICATION_SCHEMA: &str = r#"{
  "name": "",
  "dose": null,
  "route": null,
  "frequency": null,
  "duration": null,
  "prn": null
}"#;

/// Build the extraction instruction for an already-masked note.
pub fn build_extraction_prompt(masked_note: &str) -> String {
    format!(
        r#"You are an information extraction engine for outpatient clinical notes.

OUTPUT RULES (MUST FOLLOW):
- Return ONE valid JSON object only. No markdown, no code fences, no commentary.
- Use double quotes for all strings. No trailing commas. No NaN/Infinity.
- Do not invent facts. Extract ONLY what is explicitly stated in the note.
- If a value is missing, use null (or [] for lists). Do not guess.
- Do NOT infer diagnosis. Include diagnosis only if explicitly written (e.g., "Dx:", "Diagnosis:").
- Do NOT add any keys other than those in the schema below.
- Keep complaints in the order they appear in the note.

BP RULE:
- If BP is written like "120/80", set vitals.bp_systolic = "120/80" and vitals.bp_diastolic = null.
- If systolic and diastolic are stated separately, you may set both as integers.

SCHEMA (return exactly these keys, always present):
{NOTE_SCHEMA}

MEDICATION OBJECT SCHEMA (for each item in medications):
{MEDICATION_SCHEMA}

Now extract from the NOTE below and return JSON only.

NOTE:
<note>
{masked_note}
</note>
"#
    )
}

/// Build the repair instruction for output that failed to parse or coerce.
pub fn build_repair_prompt(broken_output: &str) -> String {
    format!(
        r#"You are a JSON repair engine.

TASK:
Fix the provided broken output into ONE valid JSON object that matches the schema exactly.
You may:
- Remove any non-JSON text (headers, markdown fences, commentary).
- Fix quotes (single -> double), remove trailing commas, ensure valid JSON.
- Add any missing required keys from the schema with null/[] defaults.
- Ensure lists are lists and objects are objects.

You must NOT:
- Add new medical facts that are not present in the broken output.
- Infer diagnosis or fill missing values with guesses.
- Add keys outside the schema.

TARGET SCHEMA (must match exactly, always present):
{NOTE_SCHEMA}

MEDICATION OBJECT SCHEMA:
{MEDICATION_SCHEMA}

BROKEN OUTPUT (repair this):
<broken>
{broken_output}
</broken>

Return JSON only.
"#
    )
}
