//! # Correlation Context
//!
//! A per-request identifier that links every log line, response header and
//! problem detail produced while serving one request.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Response header echoing the correlation identifier
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Request-scoped correlation identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CorrelationContext {
    id: String,
}

impl CorrelationContext {
    /// Generates a fresh context with a random UUID v4 identifier
    pub fn generate() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
        }
    }

    /// Wraps an existing identifier
    pub fn from_id<S: Into<String>>(id: S) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CorrelationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Returns true if the value has the shape of a generated correlation identifier
pub fn is_valid_correlation_id(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}
