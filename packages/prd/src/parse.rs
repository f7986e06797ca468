// ABOUTME: Decoding of model replies into PRD documents
// ABOUTME: Strict JSON first, then the first balanced object span, then a required-field check

use prdsmith_core::PrdDocument;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{PrdError, Result};

/// Remove a surrounding ``` or ```json fence if the reply has one
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string on the opening line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// First `{ ... }` span with balanced braces, ignoring braces inside strings
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decode a reply that should hold a single JSON object
pub fn decode_json_object(raw: &str) -> Result<Map<String, Value>> {
    let text = strip_code_fence(raw);

    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(strict_err) => {
            warn!("Strict JSON decode failed ({}), trying embedded object", strict_err);
            let span = extract_json_object(text).ok_or_else(|| {
                PrdError::MalformedResponse(format!("no JSON object in reply: {}", strict_err))
            })?;
            serde_json::from_str::<Value>(span)
                .map_err(|e| PrdError::MalformedResponse(e.to_string()))?
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(PrdError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Names of required fields that are absent or blank
pub fn missing_fields(doc: &PrdDocument) -> Vec<String> {
    let mut missing = Vec::new();
    if doc.title.trim().is_empty() {
        missing.push("title".to_string());
    }
    if doc.description.trim().is_empty() {
        missing.push("description".to_string());
    }
    if doc.features.is_empty() {
        missing.push("features".to_string());
    }
    missing
}

fn missing_raw_fields(map: &Map<String, Value>) -> Vec<String> {
    let blank = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .map_or(true, |s| s.trim().is_empty())
    };

    let mut missing = Vec::new();
    if blank("title") {
        missing.push("title".to_string());
    }
    if blank("description") {
        missing.push("description".to_string());
    }
    if map
        .get("features")
        .and_then(Value::as_array)
        .map_or(true, Vec::is_empty)
    {
        missing.push("features".to_string());
    }
    missing
}

/// Full decode of a generated PRD
pub fn parse_prd_document(raw: &str) -> Result<PrdDocument> {
    let map = decode_json_object(raw)?;

    let missing = missing_raw_fields(&map);
    if !missing.is_empty() {
        return Err(PrdError::IncompleteDocument(missing));
    }

    let doc: PrdDocument = serde_json::from_value(Value::Object(map))
        .map_err(|e| PrdError::MalformedResponse(format!("PRD shape mismatch: {}", e)))?;
    Ok(doc)
}
