//! # Failure Taxonomy
//!
//! Every failure a request handler can produce is one of three variants.
//! The problem-detail builder maps each variant to a response exactly once.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A type alias for Result with the error type defaulting to our ApiError
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Problem category used for request-shape failures
pub const VALIDATION_CATEGORY: &str = "validation-error";

/// Problem category used for unexpected faults
pub const INTERNAL_CATEGORY: &str = "internal-error";

/// Problem category used for framework-level HTTP errors without a typed cause
pub const HTTP_CATEGORY: &str = "http-error";

/// A single field-level constraint violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted path of the offending field, or `body` for whole-payload errors
    pub field: String,
    /// Human-readable explanation of the violated constraint
    pub message: String,
}

impl FieldError {
    pub fn new<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The closed set of failures a request can end in
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// An explicit domain rejection with a stable code
    #[error("{code}: {message}")]
    Application {
        code: String,
        message: String,
        status: u16,
    },

    /// The request body, path or query violated a constraint (always 422)
    #[error("validation failed: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// Anything else; the payload is for logs only and never reaches a client
    #[error("unhandled fault: {0}")]
    Unhandled(String),
}

impl ApiError {
    /// Creates an application error with the given code, message and HTTP status
    pub fn application<C, M>(code: C, message: M, status: u16) -> Self
    where
        C: Into<String>,
        M: Into<String>,
    {
        ApiError::Application {
            code: code.into(),
            message: message.into(),
            status,
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::application("not_found", format!("{} not found", resource), 404)
    }

    pub fn duplicate_vote(user_id: u64, feature_id: u64) -> Self {
        Self::application(
            "duplicate_vote",
            format!("User {} already voted for feature {}", user_id, feature_id),
            400,
        )
    }

    pub fn invalid_vote_value(value: i64) -> Self {
        Self::application(
            "invalid_vote_value",
            format!("Vote value must be 1 or -1, got {}", value),
            400,
        )
    }

    /// Creates a validation failure from a collection of field errors
    pub fn validation<I>(errors: I) -> Self
    where
        I: IntoIterator<Item = FieldError>,
    {
        ApiError::Validation(errors.into_iter().collect())
    }

    /// Creates a validation failure for a single field
    pub fn invalid_field<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn unhandled<S: Into<String>>(message: S) -> Self {
        ApiError::Unhandled(message.into())
    }

    /// HTTP status the failure is reported with
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Application { status, .. } => *status,
            ApiError::Validation(_) => 422,
            ApiError::Unhandled(_) => 500,
        }
    }

    /// Problem category appended to the problem type base
    pub fn category(&self) -> &str {
        match self {
            ApiError::Application { code, .. } => code,
            ApiError::Validation(_) => VALIDATION_CATEGORY,
            ApiError::Unhandled(_) => INTERNAL_CATEGORY,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Unhandled(format!("JSON error: {}", err))
    }
}
