//! String validators
//!
//! Lengths are measured in characters, not bytes, so that a 200-character
//! limit means the same thing for "café" as for "cafe".

use crate::errors::{ValidationError, ValidationResult};

/// Number of characters in a string
pub fn char_length(s: &str) -> usize {
    s.chars().count()
}

/// Validate that a string meets a minimum length requirement
pub fn min_length(s: &str, min: usize) -> ValidationResult<()> {
    let len = char_length(s);
    if len < min {
        Err(ValidationError::TooShort(format!(
            "String length ({}) is less than minimum length ({})",
            len, min
        )))
    } else {
        Ok(())
    }
}

/// Validate that a string does not exceed a maximum length
pub fn max_length(s: &str, max: usize) -> ValidationResult<()> {
    let len = char_length(s);
    if len > max {
        Err(ValidationError::TooLong(format!(
            "String length ({}) exceeds maximum length ({})",
            len, max
        )))
    } else {
        Ok(())
    }
}

/// Validate that a string length lies within `[min, max]`
pub fn length_between(s: &str, min: usize, max: usize) -> ValidationResult<()> {
    min_length(s, min)?;
    max_length(s, max)
}
