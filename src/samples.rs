//! Built-in outpatient notes for demos and offline runs. All synthetic.

pub const SAMPLE_NOTES: &[(&str, &str)] = &[
    (
        "Chest pain brief",
        "Mr X, 45/M, presents with chest pain since 2 days. Pain is central, non-radiating. \
         No syncope. BP 130/80, HR 84. No history of diabetes.\n",
    ),
    (
        "Fever and cough",
        "Ms Y, 30/F with 3 days fever and cough. Temperature 101 F, SpO2 98% on room air. \
         Chest clear. Prescribed Paracetamol 500 mg OD for 3 days PRN.\n",
    ),
    (
        "Follow-up HTN",
        "Follow up for HTN. BP 150/95 today. Continue Amlodipine 5 mg OD. Reviewed labs; \
         advised lifestyle modification.\n",
    ),
    (
        "Medication query",
        "Patient complains of headache. No focal deficits. Started Tab Ibuprofen 400 mg TID \
         for 5 days.\n",
    ),
    (
        "Pediatric visit",
        "Child, 5 yo, fever and ear pain. Diagnosis: Otitis media. Rx: Amoxicillin 250 mg BD \
         for 7 days.\n",
    ),
];

/// Sample names in display order.
pub fn names() -> impl Iterator<Item = &'static str> {
    SAMPLE_NOTES.iter().map(|(name, _)| *name)
}

/// Look up a sample by name, ignoring ASCII case.
pub fn sample(name: &str) -> Option<&'static str> {
    SAMPLE_NOTES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
        .map(|(_, note)| *note)
}
