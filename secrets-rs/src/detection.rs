//! Keyword-tagged secret detection for source files and logs.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::error;

/// Assignment shapes that are treated as secrets, in the order they apply
pub const SECRET_PATTERNS: [&str; 5] = [
    r#"(?i)password\s*[:=]\s*["']?([^"'\s]+)["']?"#,
    r#"(?i)secret\s*[:=]\s*["']?([^"'\s]+)["']?"#,
    r#"(?i)token\s*[:=]\s*["']?([^"'\s]+)["']?"#,
    r#"(?i)api[_-]?key\s*[:=]\s*["']?([^"'\s]+)["']?"#,
    r#"(?i)jwt\s*[:=]\s*["']?([^"'\s]+)["']?"#,
];

pub(crate) static SECRET_REGEXES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SECRET_PATTERNS
        .iter()
        .map(|pattern| (*pattern, Regex::new(pattern).unwrap()))
        .collect()
});

/// One pattern that matched somewhere in the scanned content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretFinding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub pattern: &'static str,
    pub matches: usize,
}

/// Count matches of every secret pattern in `content`
pub fn detect_secrets(content: &str) -> Vec<SecretFinding> {
    SECRET_REGEXES
        .iter()
        .filter_map(|(pattern, regex)| {
            let matches = regex.find_iter(content).count();
            (matches > 0).then_some(SecretFinding {
                file: None,
                pattern: *pattern,
                matches,
            })
        })
        .collect()
}

/// Scan a file for secrets. Unreadable files are logged and yield no findings.
pub fn detect_secrets_in_file<P: AsRef<Path>>(path: P) -> Vec<SecretFinding> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(content) => detect_secrets(&content)
            .into_iter()
            .map(|finding| SecretFinding {
                file: Some(path.display().to_string()),
                ..finding
            })
            .collect(),
        Err(e) => {
            error!(file = %path.display(), error = %e, "Error scanning file for secrets");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_detect_secrets_counts_per_pattern() {
        let content = r#"
            db_password = "hunter2"
            PASSWORD: letmein
            api-key=abc123
            greeting = "hello"
        "#;

        let findings = detect_secrets(content);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].pattern, SECRET_PATTERNS[0]);
        assert_eq!(findings[0].matches, 2);
        assert_eq!(findings[1].pattern, SECRET_PATTERNS[3]);
        assert_eq!(findings[1].matches, 1);
    }

    #[test]
    fn test_detect_secrets_clean_content() {
        assert!(detect_secrets("fn main() { println!(\"hi\"); }").is_empty());
    }

    #[test]
    fn test_detect_secrets_in_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "JWT: eyJhbGciOiJIUzI1NiJ9").unwrap();

        let findings = detect_secrets_in_file(file.path());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].pattern, SECRET_PATTERNS[4]);
        assert_eq!(
            findings[0].file.as_deref(),
            Some(file.path().display().to_string().as_str())
        );
    }

    #[test]
    fn test_detect_secrets_in_missing_file() {
        assert!(detect_secrets_in_file("/nonexistent/secrets.env").is_empty());
    }
}
