//! HTML sanitization utilities
//!
//! Entity encoding for text that ends up inside JSON response bodies, so a
//! client that renders a field into a page cannot be tricked into running
//! markup stored by another user.

use super::SanitizeResult;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;

lazy_static! {
    /// Characters with a meaning in HTML markup or attribute values
    static ref HTML_SPECIAL: Regex = Regex::new(r#"[&<>"']"#).unwrap();
}

fn entity_for(c: &str) -> &'static str {
    match c {
        "&" => "&amp;",
        "<" => "&lt;",
        ">" => "&gt;",
        "\"" => "&quot;",
        _ => "&#x27;",
    }
}

/// Encode HTML special characters to prevent XSS
pub fn encode_html_entities(input: &str) -> SanitizeResult<String> {
    if !HTML_SPECIAL.is_match(input) {
        return SanitizeResult::unmodified(input.to_string());
    }

    let encoded = HTML_SPECIAL
        .replace_all(input, |caps: &Captures| entity_for(&caps[0]))
        .into_owned();
    SanitizeResult::modified(encoded, Some("Encoded HTML entities".to_string()))
}

/// Encode every string leaf of a JSON document.
///
/// Object keys, numbers, booleans and nulls are left as they are, so the
/// result has the same shape as the input. Encoding is not idempotent; apply
/// it once per response.
pub fn sanitize_json_value(value: &Value) -> Value {
    sanitize_json_document(value).sanitized
}

/// Like [`sanitize_json_value`], also reporting how many strings changed
pub fn sanitize_json_document(value: &Value) -> SanitizeResult<Value> {
    let mut encoded = 0;
    let sanitized = encode_strings(value, &mut encoded);
    if encoded == 0 {
        SanitizeResult::unmodified(sanitized)
    } else {
        SanitizeResult::modified(
            sanitized,
            Some(format!("Encoded HTML entities in {} string value(s)", encoded)),
        )
    }
}

fn encode_strings(value: &Value, encoded: &mut usize) -> Value {
    match value {
        Value::String(s) => {
            let result = encode_html_entities(s);
            if result.was_modified {
                *encoded += 1;
            }
            Value::String(result.sanitized)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| encode_strings(item, encoded))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), encode_strings(item, encoded)))
                .collect(),
        ),
        other => other.clone(),
    }
}
