//! Bridges the shared failure taxonomy into axum responses.
//!
//! Handlers return [`HandlerError`]; its response carries the typed
//! [`ApiError`] in the response extensions and no body. The problem-details
//! pipeline stage turns that marker into the client-facing envelope, so
//! there is exactly one place that renders errors.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use error_handling_rs::{ApiError, FieldError, ProblemDetail, CORRELATION_HEADER, PROBLEM_JSON_CONTENT_TYPE};
use input_validation_rs::ContextualError;

use crate::store::StoreError;

#[derive(Debug, Clone)]
pub struct HandlerError(pub ApiError);

pub type HandlerResult<T> = Result<T, HandlerError>;

impl From<ApiError> for HandlerError {
    fn from(err: ApiError) -> Self {
        HandlerError(err)
    }
}

impl From<StoreError> for HandlerError {
    fn from(err: StoreError) -> Self {
        HandlerError(match err {
            StoreError::FeatureNotFound(_) => ApiError::not_found("Feature"),
            StoreError::DuplicateVote { user_id, feature_id } => {
                ApiError::duplicate_vote(user_id, feature_id)
            }
            StoreError::TallyOverflow(feature_id) => ApiError::application(
                "vote_tally_overflow",
                format!("Vote tally of feature {} cannot change further in that direction", feature_id),
                409,
            ),
        })
    }
}

impl From<Vec<ContextualError>> for HandlerError {
    fn from(errors: Vec<ContextualError>) -> Self {
        HandlerError(ApiError::validation(
            errors
                .into_iter()
                .map(|err| FieldError::new(err.field, err.error.to_string())),
        ))
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = status.into_response();
        response.extensions_mut().insert(self.0);
        response
    }
}

/// Render a problem detail as an `application/problem+json` response
pub fn problem_response(problem: &ProblemDetail) -> Response {
    let status = StatusCode::from_u16(problem.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Json(problem)).into_response();

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(PROBLEM_JSON_CONTENT_TYPE),
    );
    if let Ok(value) = HeaderValue::from_str(&problem.correlation_id) {
        headers.insert(CORRELATION_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use error_handling_rs::ProblemDetailBuilder;
    use input_validation_rs::ValidationError;

    #[test]
    fn test_handler_error_carries_marker() {
        let response = HandlerError(ApiError::not_found("Feature")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert_eq!(
            response.extensions().get::<ApiError>(),
            Some(&ApiError::not_found("Feature"))
        );
    }

    #[test]
    fn test_store_error_mapping() {
        let HandlerError(err) = StoreError::DuplicateVote { user_id: 1, feature_id: 2 }.into();
        assert_eq!(err.category(), "duplicate_vote");

        let HandlerError(err) = StoreError::FeatureNotFound(3).into();
        assert_eq!(err.status(), 404);

        let HandlerError(err) = StoreError::TallyOverflow(4).into();
        assert_eq!((err.category(), err.status()), ("vote_tally_overflow", 409));
    }

    #[test]
    fn test_field_errors_become_validation_failure() {
        let HandlerError(err) = vec![ContextualError::new(
            "title",
            ValidationError::TooShort("empty".to_string()),
        )]
        .into();
        assert_eq!(err.status(), 422);
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_problem_response_headers() {
        let problem = ProblemDetailBuilder::default().build("not_found", "API Error", 404, "x", None, None);
        let response = problem_response(&problem);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            PROBLEM_JSON_CONTENT_TYPE
        );
        assert_eq!(
            response.headers()[CORRELATION_HEADER].to_str().unwrap(),
            problem.correlation_id
        );
    }
}
