//! Numeric validators
//!
//! This module provides validators for numeric inputs.

use crate::errors::{ValidationError, ValidationResult};

/// Validate that a numeric value is non-negative
pub fn non_negative<T>(value: T) -> ValidationResult<()>
where
    T: PartialOrd + Default + std::fmt::Debug,
{
    if value < T::default() {
        Err(ValidationError::OutOfRange(format!(
            "Value {:?} is negative",
            value
        )))
    } else {
        Ok(())
    }
}

/// Validate that a float is neither NaN nor infinite
pub fn finite(value: f64) -> ValidationResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat(format!(
            "Value {} is not a finite number",
            value
        )))
    }
}

/// Validate that a float is finite and not below zero
pub fn finite_non_negative(value: f64) -> ValidationResult<()> {
    finite(value)?;
    non_negative(value)
}

/// Validate that a value is one of the allowed values
pub fn one_of<T>(value: T, allowed: &[T]) -> ValidationResult<()>
where
    T: PartialEq + std::fmt::Debug,
{
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat(format!(
            "Value {:?} is not one of the allowed values: {:?}",
            value, allowed
        )))
    }
}
