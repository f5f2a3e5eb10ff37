//! Validation builder pattern
//!
//! Collects the outcome of every field check of a payload so that a client
//! receives all violations in one response rather than the first one only.

use crate::errors::{ContextualError, ValidationResult};

/// Builder for chaining field validation results
#[derive(Debug, Clone, Default)]
pub struct ValidationBuilder {
    errors: Vec<ContextualError>,
}

impl ValidationBuilder {
    /// Create a new validation builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of validating `field`
    pub fn field(mut self, field: &str, result: ValidationResult<()>) -> Self {
        if let Err(err) = result {
            self.errors.push(ContextualError::new(field, err));
        }
        self
    }

    /// Validate an optional field; absent values always pass
    pub fn optional<T, F>(self, field: &str, value: Option<T>, validator: F) -> Self
    where
        F: FnOnce(T) -> ValidationResult<()>,
    {
        match value {
            Some(value) => self.field(field, validator(value)),
            None => self,
        }
    }

    /// Finish validation and return every recorded violation
    pub fn finish(self) -> Result<(), Vec<ContextualError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
