// PII masking gate. Every note passes through here before any text reaches
// a model provider; downstream stages only ever see the masked text.

use std::sync::LazyLock;

use regex::Regex;

/// A compiled PII pattern with its redaction label.
struct PiiPattern {
    regex: Regex,
    label: &'static str,
}

/// Pattern sources in fixed application order. The order only decides flag order.
const PII_PATTERN_SOURCES: &[(&str, &str)] = &[
    // Optional country code needs a '+' or a separator so a bare 12-digit run
    // stays a national ID rather than a phone number.
    (
        "PHONE",
        r"(?:\+\d{1,3}[-.\s]?|\b\d{1,3}[-.\s]|\b)(?:\d{10}|\d{3}[-.\s]\d{3}[-.\s]\d{4})\b",
    ),
    ("EMAIL", r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+"),
    ("AADHAAR", r"\b\d{12}\b"),
    ("MRN", r"(?i)\bMRN[:#\s]*[A-Za-z0-9-]+\b"),
];

static PII_PATTERNS: LazyLock<Vec<PiiPattern>> = LazyLock::new(|| {
    PII_PATTERN_SOURCES
        .iter()
        .filter_map(|(label, source)| compile_pattern(label, source))
        .collect()
});

/// A category whose pattern does not compile is skipped, never fatal.
fn compile_pattern(label: &'static str, source: &str) -> Option<PiiPattern> {
    match Regex::new(source) {
        Ok(regex) => Some(PiiPattern { regex, label }),
        Err(e) => {
            tracing::warn!(label, error = %e, "PII pattern failed to compile, category skipped");
            None
        }
    }
}

/// Flag emitted once per PII category found in a note.
pub fn pii_flag(label: &str) -> String {
    format!("PII detected: {label}")
}

/// Replacement token for a PII category.
pub fn redaction_token(label: &str) -> String {
    format!("[{label} REDACTED]")
}

/// Redact phone numbers, emails, national IDs and MRNs.
///
/// Returns the masked text plus one `"PII detected: <LABEL>"` flag per category
/// that matched, in pattern order.
pub fn mask_pii(note: &str) -> (String, Vec<String>) {
    let mut masked = note.to_string();
    let mut flags: Vec<String> = Vec::new();

    for pattern in PII_PATTERNS.iter() {
        let (next, hits) = mask_pattern(&masked, pattern);
        if hits > 0 {
            let flag = pii_flag(pattern.label);
            if !flags.contains(&flag) {
                flags.push(flag);
            }
            tracing::debug!(label = pattern.label, hits, "PII redacted");
        }
        masked = next;
    }

    (masked, flags)
}

/// Replace every match of one pattern. Returns (text, match_count).
///
/// The body of an existing redaction token (`MRN REDACTED` inside
/// `[MRN REDACTED]`) is left alone and not counted.
fn mask_pattern(text: &str, pattern: &PiiPattern) -> (String, usize) {
    let token = redaction_token(pattern.label);
    let existing = format!("{} REDACTED", pattern.label);
    let mut hits = 0;
    let replaced = pattern
        .regex
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let found = &caps[0];
            if found == existing {
                found.to_string()
            } else {
                hits += 1;
                token.clone()
            }
        })
        .into_owned();
    (replaced, hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residual(label: &str, text: &str) -> bool {
        PII_PATTERNS
            .iter()
            .find(|p| p.label == label)
            .map(|p| mask_pattern(text, p).1 > 0)
            .unwrap()
    }

    #[test]
    fn all_categories_compile() {
        assert_eq!(PII_PATTERNS.len(), PII_PATTERN_SOURCES.len());
    }

    #[test]
    fn clean_note_passes_unchanged() {
        let note = "Patient with cough for 2 days. BP 120/80, HR 78.";
        let (masked, flags) = mask_pii(note);
        assert_eq!(masked, note);
        assert!(flags.is_empty());
    }

    #[test]
    fn phone_number_redacted() {
        let (masked, flags) = mask_pii("Call 987-654-3210 for results.");
        assert_eq!(masked, "Call [PHONE REDACTED] for results.");
        assert_eq!(flags, vec!["PII detected: PHONE"]);
    }

    #[test]
    fn phone_with_country_code_redacted() {
        let (masked, _) = mask_pii("Contact +91 9876543210 today");
        assert_eq!(masked, "Contact [PHONE REDACTED] today");
    }

    #[test]
    fn email_redacted() {
        let (masked, flags) = mask_pii("Mail reports to ravi.k+lab@example.co.in please");
        assert_eq!(masked, "Mail reports to [EMAIL REDACTED] please");
        assert_eq!(flags, vec!["PII detected: EMAIL"]);
    }

    #[test]
    fn twelve_digit_id_is_not_a_phone() {
        let (masked, flags) = mask_pii("Aadhaar 123456789012 on file");
        assert_eq!(masked, "Aadhaar [AADHAAR REDACTED] on file");
        assert_eq!(flags, vec!["PII detected: AADHAAR"]);
    }

    #[test]
    fn mrn_redacted_case_insensitive() {
        let (masked, flags) = mask_pii("mrn: AB-12345 seen in OPD");
        assert_eq!(masked, "[MRN REDACTED] seen in OPD");
        assert_eq!(flags, vec!["PII detected: MRN"]);
    }

    #[test]
    fn all_letter_mrn_redacted() {
        let (masked, flags) = mask_pii("MRN: ABCDEF seen today");
        assert_eq!(masked, "[MRN REDACTED] seen today");
        assert_eq!(flags, vec!["PII detected: MRN"]);
    }

    #[test]
    fn existing_mrn_token_not_counted() {
        let (masked, flags) = mask_pii("[MRN REDACTED] and mrn#XK-ALPHA");
        assert_eq!(masked, "[MRN REDACTED] and [MRN REDACTED]");
        assert_eq!(flags, vec!["PII detected: MRN"]);

        let (_, flags) = mask_pii("[MRN REDACTED] only");
        assert!(flags.is_empty());
    }

    #[test]
    fn repeated_matches_emit_single_flag() {
        let (masked, flags) = mask_pii("a@b.com and c@d.org");
        assert_eq!(masked, "[EMAIL REDACTED] and [EMAIL REDACTED]");
        assert_eq!(flags, vec!["PII detected: EMAIL"]);
    }

    #[test]
    fn flags_follow_pattern_order() {
        let note = "MRN 4455 email x@y.com phone 9876543210";
        let (_, flags) = mask_pii(note);
        assert_eq!(
            flags,
            vec!["PII detected: PHONE", "PII detected: EMAIL", "PII detected: MRN"]
        );
    }

    #[test]
    fn no_residual_matches_after_masking() {
        let note = "Ph 9876543210, id 123456789012, MRN#778899, mail p@q.io";
        let (masked, flags) = mask_pii(note);
        assert_eq!(flags.len(), 4);
        for label in ["PHONE", "EMAIL", "AADHAAR", "MRN"] {
            assert!(!residual(label, &masked), "{label} still matches in {masked}");
        }
    }

    #[test]
    fn masking_is_stable_on_masked_text() {
        let (once, _) = mask_pii("MRN 12345, call 987.654.3210");
        let (twice, flags) = mask_pii(&once);
        assert_eq!(once, twice);
        assert!(flags.is_empty());
    }

    #[test]
    fn invalid_pattern_is_skipped() {
        assert!(compile_pattern("BROKEN", r"(unclosed").is_none());
    }
}
