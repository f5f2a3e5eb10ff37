//! Validator functions and utilities
//!
//! This module provides specialized validators for different types of input.
//! These validators can be used directly or with the validation builder.

pub mod numeric;
pub mod string;

// Re-export all validators for convenience
pub use numeric::*;
pub use string::*;
