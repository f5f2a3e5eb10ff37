//! Secret handling for the feature votes service.
//!
//! [`SecretClassifier`] resolves secrets from the environment and caches
//! them; the free functions mask values for logs and scan text for secrets
//! that should never have been committed.

pub mod classifier;
pub mod detection;
pub mod masking;

pub use classifier::{
    SecretClassifier, SecretError, SecretIssue, DB_PASSWORD, ENCRYPTION_KEY, JWT_SECRET_KEY,
    MIN_STRONG_SECRET_LENGTH,
};
pub use detection::{detect_secrets, detect_secrets_in_file, SecretFinding, SECRET_PATTERNS};
pub use masking::{mask, mask_key_name, mask_structure, DEFAULT_VISIBLE_CHARS, MASK};
