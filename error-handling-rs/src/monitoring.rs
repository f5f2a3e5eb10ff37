//! Problem-response metrics and log records.

use metrics::counter;
use tracing::{error, warn};

use crate::problem::ProblemDetail;

/// Counter of problem-detail responses, labelled by category and status
pub const PROBLEM_COUNTER: &str = "problem_responses_total";

/// Record a problem response: one counter increment and one log line,
/// warn for client errors and error for server errors.
pub fn record_problem(problem: &ProblemDetail, category: &str) {
    counter!(
        PROBLEM_COUNTER,
        1,
        "category" => category.to_string(),
        "status" => problem.status.to_string()
    );

    if problem.status >= 500 {
        error!(
            correlation_id = %problem.correlation_id,
            category = %category,
            status = problem.status,
            instance = ?problem.instance,
            "Request failed"
        );
    } else {
        warn!(
            correlation_id = %problem.correlation_id,
            category = %category,
            status = problem.status,
            detail = %problem.detail,
            instance = ?problem.instance,
            "Request rejected"
        );
    }
}
