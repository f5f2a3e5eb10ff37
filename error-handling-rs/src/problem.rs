//! # Problem Details
//!
//! Builds RFC 7807 problem-detail envelopes. Every failed request goes
//! through [`ProblemDetailBuilder`], which attaches the request's correlation
//! identifier and scrubs the detail text before it can reach a client.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::context::CorrelationContext;
use crate::monitoring::record_problem;
use crate::sanitization::{scrub, scrub_error_detail};
use crate::types::{ApiError, HTTP_CATEGORY};

/// Media type of problem-detail responses
pub const PROBLEM_JSON_CONTENT_TYPE: &str = "application/problem+json";

/// Default namespace for the `type` member
pub const DEFAULT_PROBLEM_TYPE_BASE: &str = "https://feature-votes.example/problems/";

/// Client-facing detail for unexpected faults
pub const GENERIC_FAULT_DETAIL: &str =
    "An unexpected error occurred. Please try again later.";

/// RFC 7807 problem detail body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetail {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    /// Always scrubbed
    pub detail: String,
    pub correlation_id: String,
    /// RFC 3339 UTC instant
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Converts failures into problem details under a fixed type namespace
#[derive(Debug, Clone)]
pub struct ProblemDetailBuilder {
    type_base: String,
}

impl Default for ProblemDetailBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PROBLEM_TYPE_BASE)
    }
}

impl ProblemDetailBuilder {
    pub fn new<S: Into<String>>(type_base: S) -> Self {
        Self {
            type_base: type_base.into(),
        }
    }

    pub fn type_base(&self) -> &str {
        &self.type_base
    }

    /// Builds a problem detail, generating a correlation identifier when the
    /// request carries none
    pub fn build(
        &self,
        category: &str,
        title: &str,
        status: u16,
        detail: &str,
        correlation: Option<&CorrelationContext>,
        instance: Option<&str>,
    ) -> ProblemDetail {
        let correlation_id = correlation
            .map(|ctx| ctx.id().to_string())
            .unwrap_or_else(|| CorrelationContext::generate().id().to_string());

        let problem = ProblemDetail {
            problem_type: format!("{}{}", self.type_base, category),
            title: title.to_string(),
            status,
            detail: scrub_error_detail(detail),
            correlation_id,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            instance: instance.map(str::to_string),
        };

        record_problem(&problem, category);
        problem
    }

    /// Maps a typed failure to its problem detail
    pub fn from_error(
        &self,
        error: &ApiError,
        correlation: Option<&CorrelationContext>,
        instance: Option<&str>,
    ) -> ProblemDetail {
        match error {
            ApiError::Application {
                code,
                message,
                status,
            } => self.build(code, "API Error", *status, message, correlation, instance),
            ApiError::Validation(errors) => {
                let details = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                self.build(
                    error.category(),
                    "Validation Failed",
                    422,
                    &format!("Request validation failed: {}", details),
                    correlation,
                    instance,
                )
            }
            ApiError::Unhandled(raw) => {
                tracing::error!(
                    correlation_id = %correlation.map(CorrelationContext::id).unwrap_or("unknown"),
                    fault = %scrub_error_detail(raw),
                    "Unhandled fault"
                );
                self.build(
                    error.category(),
                    "Internal Server Error",
                    500,
                    GENERIC_FAULT_DETAIL,
                    correlation,
                    instance,
                )
            }
        }
    }

    /// Builds a problem for an error status raised without a typed cause
    pub fn from_status(
        &self,
        status: u16,
        reason: &str,
        correlation: Option<&CorrelationContext>,
        instance: Option<&str>,
    ) -> ProblemDetail {
        self.build(
            HTTP_CATEGORY,
            "HTTP Error",
            status,
            &scrub(reason),
            correlation,
            instance,
        )
    }
}
