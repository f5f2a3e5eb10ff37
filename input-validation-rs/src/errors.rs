//! Error handling for the validation library
//!
//! Validators return a [`ValidationError`]; the builder attaches the field it
//! was checking, producing a [`ContextualError`].

use std::fmt;
use thiserror::Error;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Enum representing different validation error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Input is too long
    #[error("Input exceeds maximum length: {0}")]
    TooLong(String),

    /// Input is too short
    #[error("Input is shorter than minimum length: {0}")]
    TooShort(String),

    /// Input is outside numeric range
    #[error("Value is outside allowed range: {0}")]
    OutOfRange(String),

    /// Input format is invalid
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Contextual validation error that includes field information
#[derive(Debug, Clone, PartialEq)]
pub struct ContextualError {
    /// The field or context where the error occurred
    pub field: String,
    /// The validation error
    pub error: ValidationError,
}

impl ContextualError {
    /// Create a new contextual error
    pub fn new<S: Into<String>>(field: S, error: ValidationError) -> Self {
        Self {
            field: field.into(),
            error,
        }
    }
}

impl fmt::Display for ContextualError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.error)
    }
}
