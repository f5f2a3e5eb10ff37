//! Masking helpers for secret values, key names and log payloads.

use serde_json::Value;

use crate::detection::SECRET_REGEXES;

/// Opaque replacement for values too short to partially reveal
pub const MASK: &str = "***";

/// Characters kept visible at each end by [`mask`]'s usual callers
pub const DEFAULT_VISIBLE_CHARS: usize = 2;

/// Keep `visible_chars` characters at both ends and hide the middle.
///
/// Values no longer than three times `visible_chars` are hidden entirely.
pub fn mask(value: &str, visible_chars: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.is_empty() || chars.len() <= visible_chars.saturating_mul(3) {
        return MASK.to_string();
    }

    let head: String = chars[..visible_chars].iter().collect();
    let tail: String = chars[chars.len() - visible_chars..].iter().collect();
    format!("{}{}{}", head, MASK, tail)
}

/// Mask an environment key name for log lines and error messages
pub fn mask_key_name(key: &str) -> String {
    let parts: Vec<&str> = key.split('_').collect();
    if parts.len() > 1 {
        let first = parts[0].chars().next().map(String::from).unwrap_or_default();
        let last = parts[parts.len() - 1]
            .chars()
            .next()
            .map(String::from)
            .unwrap_or_default();
        return format!("{}...{}", first, last);
    }

    if key.chars().count() > 6 {
        format!("{}...", key.chars().take(3).collect::<String>())
    } else {
        MASK.to_string()
    }
}

fn mask_string(text: &str) -> String {
    SECRET_REGEXES
        .iter()
        .fold(text.to_string(), |current, (_, regex)| {
            regex
                .replace_all(&current, |caps: &regex::Captures| {
                    mask(&caps[0], DEFAULT_VISIBLE_CHARS)
                })
                .into_owned()
        })
}

/// Recursively mask secret assignments in every string of a JSON value
pub fn mask_structure(data: &Value) -> Value {
    match data {
        Value::String(s) => Value::String(mask_string(s)),
        Value::Array(items) => Value::Array(items.iter().map(mask_structure).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), mask_structure(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}
