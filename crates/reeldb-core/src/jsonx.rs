//! Best-effort JSON extraction from noisy LLM output.
//!
//! Completion services wrap JSON in code fences, lead with "json" labels or
//! stray quotes. The pipeline is: normalize (strip fences/labels/quotes),
//! try a direct parse, then fall back to brace-matched substring extraction.

use serde_json::Value;

/// Strip code fences, a leading "json" label and symmetric quote wrappers.
pub fn normalize_llm_text(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
        text = text.strip_suffix("```").unwrap_or(text);
    }
    let mut text = text.trim().trim_matches('`').trim();
    // get(..4) is None when byte 4 splits a multi-byte char, so non-ASCII
    // replies pass through instead of slicing mid-character.
    if text.get(..4).is_some_and(|label| label.eq_ignore_ascii_case("json")) {
        text = text[4..].trim_start();
    }
    if (text.starts_with('"') && text.ends_with('"') && text.len() >= 2)
        || (text.starts_with('\'') && text.ends_with('\'') && text.len() >= 2)
    {
        text = text[1..text.len() - 1].trim();
    }
    text.to_string()
}

/// Extract the first JSON object from possibly noisy text.
pub fn extract_json_object(raw: &str) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    let cleaned = normalize_llm_text(raw);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        if value.is_object() {
            return Some(value);
        }
    }

    // Fallback: first top-level {...} block via brace counting. String
    // escapes are respected so braces inside values don't end the block.
    let start = cleaned.find('{')?;
    let bytes = cleaned.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let snippet = &cleaned[start..=i];
                    return serde_json::from_str::<Value>(snippet)
                        .ok()
                        .filter(Value::is_object);
                }
            }
            _ => {}
        }
    }
    None
}
