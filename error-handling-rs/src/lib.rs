//! # Error Handling Framework
//!
//! Failure taxonomy and response plumbing for the feature votes service.
//!
//! ## Features
//!
//! - A closed [`ApiError`] enum covering every way a request can fail
//! - RFC 7807 problem-detail envelopes with correlation identifiers
//! - Scrubbing of personal data and secrets from any client-bound text
//! - Structured logging with per-request spans
//!

pub mod context;
pub mod logging;
pub mod monitoring;
pub mod problem;
pub mod sanitization;
pub mod types;

// Re-export commonly used types
pub use context::{is_valid_correlation_id, CorrelationContext, CORRELATION_HEADER};
pub use logging::{init_logging, request_span, LoggingConfig, LoggingError};
pub use problem::{
    ProblemDetail, ProblemDetailBuilder, DEFAULT_PROBLEM_TYPE_BASE, GENERIC_FAULT_DETAIL,
    PROBLEM_JSON_CONTENT_TYPE,
};
pub use sanitization::{scrub, scrub_error_detail, scrub_structure};
pub use types::{ApiError, FieldError, Result};
