//! # Sensitive-Data Scrubbing
//!
//! Pattern-based redaction of emails, keyword-tagged secrets, phone numbers,
//! payment-card numbers and stack-trace fragments from free text and JSON
//! structures before they reach logs or error bodies.
//!
//! The patterns are heuristics. They reduce accidental leakage of common
//! sensitive values; they do not guarantee that deliberately obfuscated data
//! is caught, and nothing here should be treated as a security boundary.
//!
//! [`scrub`] is idempotent: scrubbing already-scrubbed text returns it
//! unchanged.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

/// Replacement for masked values
pub const MASK: &str = "***";

/// Replacement for collapsed Python-style tracebacks
pub const TRACEBACK_PLACEHOLDER: &str = "Traceback removed";

/// Replacement for collapsed Rust backtraces
pub const BACKTRACE_PLACEHOLDER: &str = "Backtrace removed";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

// Group 1: keyword, group 2: separator, groups 3-5: single-quoted,
// double-quoted or bare value.
static KEYWORD_SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)([\w-]*(?:password|auth[_-]?token|token|secret|api[_-]?key)[\w-]*)(['"]?\s*[:=]\s*)(?:'([^']*)'|"([^"]*)"|([^'"\s,;&]+))"#,
    )
    .unwrap()
});

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\+\d{1,3}[\s-]?\(?\d{3}\)?[\s-]?\d{3}[\s-]?\d{2}[\s-]?\d{2}\b").unwrap()
});

static CARD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").unwrap()
});

static PY_FILE_LINE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"File "[^"]+", line \d+"#).unwrap());

static RUST_LOCATION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w./\\-]+\.rs:\d+(?::\d+)?").unwrap());

static PY_TRACEBACK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Traceback\s*\(most recent call last\):.*?(\n\n|\z)").unwrap()
});

static RUST_BACKTRACE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)stack backtrace:.*?(\n\n|\z)").unwrap());

// Key fragments that mark a structured field as sensitive
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "auth_token",
    "credit_card",
    "ssn",
    "email",
];

/// Masks an email address as `u***@domain`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => match local.chars().next() {
            Some(first) => format!("{}{}@{}", first, MASK, domain),
            None => format!("{}@{}", MASK, domain),
        },
        None => MASK.to_string(),
    }
}

/// Masks a password or token completely
pub fn mask_password(_value: &str) -> String {
    MASK.to_string()
}

/// Masks a card number as `****-****-****-1234`
pub fn mask_credit_card(text: &str) -> String {
    let digits: Vec<char> = text.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return "****".to_string();
    }
    let last_four: String = digits[digits.len() - 4..].iter().collect();
    format!("****-****-****-{}", last_four)
}

/// Masks a phone number as `+7 *** *** 1234`
pub fn mask_phone(text: &str) -> String {
    let digits: Vec<char> = text.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return MASK.to_string();
    }
    let last_four: String = digits[digits.len() - 4..].iter().collect();
    format!("+{} {} {} {}", digits[0], MASK, MASK, last_four)
}

// Masking one match can expose another (e.g. chained `a@b.cc@d.com`), so the
// passes are repeated until the text stops changing.
const MAX_SCRUB_PASSES: usize = 5;

fn until_stable<F>(text: &str, pass: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut current = pass(text);
    for _ in 1..MAX_SCRUB_PASSES {
        let next = pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn scrub_pass(text: &str) -> String {
    let masked = EMAIL_PATTERN.replace_all(text, |caps: &Captures| mask_email(&caps[0]));

    let masked = KEYWORD_SECRET_PATTERN.replace_all(&masked, |caps: &Captures| {
        let prefix = format!("{}{}", &caps[1], &caps[2]);
        if caps.get(3).is_some() {
            format!("{}'{}'", prefix, MASK)
        } else if caps.get(4).is_some() {
            format!("{}\"{}\"", prefix, MASK)
        } else {
            format!("{}{}", prefix, MASK)
        }
    });

    let masked = PHONE_PATTERN.replace_all(&masked, |caps: &Captures| mask_phone(&caps[0]));

    CARD_PATTERN
        .replace_all(&masked, |caps: &Captures| mask_credit_card(&caps[0]))
        .into_owned()
}

fn strip_traces_pass(text: &str) -> String {
    let stripped = scrub_pass(text);

    let stripped = PY_TRACEBACK_PATTERN.replace_all(&stripped, |caps: &Captures| {
        format!("{}{}", TRACEBACK_PLACEHOLDER, &caps[1])
    });
    let stripped = RUST_BACKTRACE_PATTERN.replace_all(&stripped, |caps: &Captures| {
        format!("{}{}", BACKTRACE_PLACEHOLDER, &caps[1])
    });
    let stripped = PY_FILE_LINE_PATTERN.replace_all(&stripped, "File ***, line ***");

    RUST_LOCATION_PATTERN
        .replace_all(&stripped, "***:***")
        .into_owned()
}

/// Detects and masks sensitive data in free text
///
/// Passes run in a fixed order: emails, keyword-tagged secrets, phone
/// numbers, card numbers.
pub fn scrub(text: &str) -> String {
    until_stable(text, scrub_pass)
}

/// Scrubs an error detail and strips source locations and stack traces
pub fn scrub_error_detail(detail: &str) -> String {
    until_stable(detail, strip_traces_pass)
}

/// Determines if a structured key names a sensitive field
fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    SENSITIVE_KEYS
        .iter()
        .any(|sensitive| key_lower.contains(sensitive))
}

fn mask_sensitive_field(key: &str, value: &Value) -> Value {
    let key_lower = key.to_lowercase();
    match value {
        Value::String(s) if key_lower.contains("email") => Value::String(mask_email(s)),
        Value::String(s) if key_lower.contains("card") => Value::String(mask_credit_card(s)),
        Value::String(s) => Value::String(mask_password(s)),
        _ => Value::String(MASK.to_string()),
    }
}

fn looks_like_email(value: &str) -> bool {
    value.contains('@') && value.contains('.')
}

/// Recursively masks sensitive fields in a JSON structure for safe logging
pub fn scrub_structure(data: &Value) -> Value {
    match data {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let scrubbed = if is_sensitive_key(key) {
                        mask_sensitive_field(key, value)
                    } else {
                        scrub_structure(value)
                    };
                    (key.clone(), scrubbed)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(scrub_structure).collect()),
        Value::String(s) if looks_like_email(s) => Value::String(mask_email(s)),
        other => other.clone(),
    }
}
