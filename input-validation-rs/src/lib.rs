//! # Input Validation Library
//!
//! Validation and sanitization utilities shared by the feature votes service.
//!
//! ## Features
//!
//! - Validators for strings and numbers, counted the way clients see them
//! - A builder that gathers every field violation of a payload at once
//! - HTML entity encoding of JSON response bodies
//! - Comprehensive error handling

mod builder;
mod errors;
pub mod sanitizers;
pub mod validators;

pub use builder::ValidationBuilder;
pub use errors::{ContextualError, ValidationError, ValidationResult};
