use std::fmt;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::masking::mask_key_name;

/// Environment key holding the token signing secret
pub const JWT_SECRET_KEY: &str = "JWT_SECRET_KEY";
/// Environment key holding the database password
pub const DB_PASSWORD: &str = "DB_PASSWORD";
/// Environment key holding the symmetric encryption key
pub const ENCRYPTION_KEY: &str = "ENCRYPTION_KEY";

/// Minimum length for signing and encryption secrets
pub const MIN_STRONG_SECRET_LENGTH: usize = 32;

const MIN_KEY_LENGTH: usize = 8;
const WEAK_DEFAULTS: [&str; 5] = ["password", "secret", "changeme", "123456", "admin"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// Carries the masked key name only
    #[error("Secret '{0}' not found in environment")]
    Missing(String),

    #[error("Secret '{key}' is too short: {length} chars (required: >= {required})")]
    TooShort {
        key: String,
        length: usize,
        required: usize,
    },
}

/// Problems noticed while validating a resolved secret. None of them fail the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretIssue {
    Empty,
    TooShort { length: usize },
    WeakDefault,
}

impl fmt::Display for SecretIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretIssue::Empty => f.write_str("empty"),
            SecretIssue::TooShort { length } => write!(f, "too short: {} chars", length),
            SecretIssue::WeakDefault => f.write_str("uses default/weak value"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupStatus {
    Found,
    UsedDefault,
    NotFound,
}

impl fmt::Display for LookupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LookupStatus::Found => "found",
            LookupStatus::UsedDefault => "used_default",
            LookupStatus::NotFound => "not_found",
        })
    }
}

type SecretSource = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolves secrets from the process environment and keeps them cached.
///
/// Plaintext values stay inside the cache; logs and errors only ever see
/// masked key names.
pub struct SecretClassifier {
    source: SecretSource,
    cache: DashMap<String, String>,
    logged_keys: DashSet<String>,
}

impl Default for SecretClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecretClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretClassifier")
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl SecretClassifier {
    /// Classifier reading the process environment
    pub fn new() -> Self {
        Self::with_source(|key| std::env::var(key).ok())
    }

    /// Classifier reading from a custom source
    pub fn with_source<F>(source: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            source: Arc::new(source),
            cache: DashMap::new(),
            logged_keys: DashSet::new(),
        }
    }

    /// Resolve `key`, falling back to `default` when it is not set
    pub fn lookup(&self, key: &str, default: Option<&str>) -> Result<String, SecretError> {
        if let Some(cached) = self.cache.get(key) {
            debug!(secret = %mask_key_name(key), "Secret served from cache");
            return Ok(cached.value().clone());
        }

        let value = match ((self.source)(key), default) {
            (Some(value), _) => {
                self.log_access(key, LookupStatus::Found);
                value
            }
            (None, Some(default)) => {
                self.log_access(key, LookupStatus::UsedDefault);
                default.to_string()
            }
            (None, None) => {
                self.log_access(key, LookupStatus::NotFound);
                return Err(SecretError::Missing(mask_key_name(key)));
            }
        };

        self.validate(key, &value);
        self.cache.insert(key.to_string(), value.clone());
        Ok(value)
    }

    /// Resolve `key` and warn when the value is shorter than `min_length`
    pub fn lookup_with_min_length(&self, key: &str, min_length: usize) -> Result<String, SecretError> {
        let value = self.lookup(key, None)?;
        let length = value.chars().count();
        if length < min_length {
            warn!(
                secret = %mask_key_name(key),
                length,
                recommended = min_length,
                "Secret is shorter than recommended"
            );
        }
        Ok(value)
    }

    /// Check a value for common weaknesses, logging each one
    pub fn validate(&self, key: &str, value: &str) -> Vec<SecretIssue> {
        let masked = mask_key_name(key);
        let mut issues = Vec::new();

        if value.trim().is_empty() {
            error!(secret = %masked, "Secret is empty");
            issues.push(SecretIssue::Empty);
        }

        let length = value.chars().count();
        if length < MIN_KEY_LENGTH && key.to_lowercase().contains("key") {
            warn!(secret = %masked, length, "Secret is too short");
            issues.push(SecretIssue::TooShort { length });
        }

        let lowered = value.to_lowercase();
        if WEAK_DEFAULTS.contains(&lowered.as_str()) {
            error!(secret = %masked, "Secret uses default/weak value");
            issues.push(SecretIssue::WeakDefault);
        }

        issues
    }

    /// Token signing secret; short values are accepted with a warning
    pub fn jwt_secret(&self) -> Result<String, SecretError> {
        self.lookup_with_min_length(JWT_SECRET_KEY, MIN_STRONG_SECRET_LENGTH)
    }

    pub fn db_password(&self) -> Result<String, SecretError> {
        self.lookup(DB_PASSWORD, None)
    }

    /// Encryption key bytes; values shorter than 32 characters are rejected
    pub fn encryption_key(&self) -> Result<Vec<u8>, SecretError> {
        let value = self.lookup(ENCRYPTION_KEY, None)?;
        let length = value.chars().count();
        if length < MIN_STRONG_SECRET_LENGTH {
            return Err(SecretError::TooShort {
                key: mask_key_name(ENCRYPTION_KEY),
                length,
                required: MIN_STRONG_SECRET_LENGTH,
            });
        }
        Ok(value.into_bytes())
    }

    fn log_access(&self, key: &str, status: LookupStatus) {
        if self.logged_keys.insert(key.to_string()) {
            info!(secret = %mask_key_name(key), status = %status, "Secret access");
        }
    }
}
