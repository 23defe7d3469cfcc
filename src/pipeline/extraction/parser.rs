// Recover a single JSON object from free-form model output.

use serde_json::Value;

use crate::pipeline::PipelineError;

/// Parse model output into a JSON object.
///
/// Tries the whole text first, then a ```json (or untagged) fenced block,
/// then the first brace-delimited span that contains a colon. The first
/// candidate that parses to an object wins.
pub fn recover_json(text: &str) -> Result<Value, PipelineError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::JsonRecovery("empty model output".into()));
    }

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let mut last_error = None;
    for candidate in [extract_fenced_block(trimmed), extract_brace_span(trimmed)]
        .into_iter()
        .flatten()
    {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value @ Value::Object(_)) => return Ok(value),
            Ok(_) => last_error = Some("recovered JSON is not an object".to_string()),
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(PipelineError::JsonRecovery(
        last_error.unwrap_or_else(|| "no JSON object found in output".into()),
    ))
}

/// Contents of the first non-empty fence tagged `json` (any case) or untagged.
/// Fences with another language tag are skipped.
fn extract_fenced_block(text: &str) -> Option<&str> {
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after_fence = &rest[open + 3..];
        let tag_len = after_fence
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(after_fence.len());
        let (tag, body) = after_fence.split_at(tag_len);

        let close = body.find("```")?;
        let block = body[..close].trim();
        if (tag.is_empty() || tag.eq_ignore_ascii_case("json")) && !block.is_empty() {
            return Some(block);
        }
        rest = &body[close + 3..];
    }
    None
}

/// First span from an opening brace to the latest closing brace after it
/// that contains a colon.
fn extract_brace_span(text: &str) -> Option<&str> {
    let starts: Vec<usize> = text.match_indices('{').map(|(i, _)| i).collect();
    let ends: Vec<usize> = text.match_indices('}').map(|(i, _)| i).collect();

    for &start in &starts {
        for &end in ends.iter().rev() {
            if end <= start {
                break;
            }
            let candidate = &text[start..=end];
            if candidate.contains(':') {
                return Some(candidate.trim());
            }
        }
    }
    None
}
