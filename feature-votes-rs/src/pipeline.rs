//! Request pipeline.
//!
//! An ordered list of [`PipelineStage`]s installed as a single axum
//! middleware. Each stage receives the request and a [`PipelineNext`] that
//! runs the remaining stages and finally the router.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use error_handling_rs::{
    request_span, ApiError, CorrelationContext, ProblemDetailBuilder, CORRELATION_HEADER,
    PROBLEM_JSON_CONTENT_TYPE,
};
use input_validation_rs::sanitizers::sanitize_json_document;
use tracing::{debug, info, warn, Instrument};

use crate::error::problem_response;

const JSON_CONTENT_TYPE: &str = "application/json";

const SECURITY_HEADERS: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "content-security-policy",
        "default-src 'self'; script-src 'none'; style-src 'none'; img-src 'self' data:; font-src 'self'; connect-src 'self';",
    ),
    (
        "permissions-policy",
        "geolocation=(), microphone=(), camera=(), payment=()",
    ),
];

const HSTS_HEADER: (&str, &str) = (
    "strict-transport-security",
    "max-age=31536000; includeSubDomains",
);

#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, request: Request, next: PipelineNext<'_>) -> Response;
}

/// The rest of the chain after the current stage
pub struct PipelineNext<'a> {
    stages: &'a [Arc<dyn PipelineStage>],
    inner: Next,
}

impl<'a> PipelineNext<'a> {
    pub async fn run(self, request: Request) -> Response {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = PipelineNext {
                    stages: rest,
                    inner: self.inner,
                };
                stage.handle(request, next).await
            }
            None => self.inner.run(request).await,
        }
    }
}

/// Ordered stages, outermost first
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Arc<dyn PipelineStage>]>,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn PipelineStage>>) -> Self {
        Self {
            stages: stages.into(),
        }
    }

    /// Correlation, output sanitization, security headers, problem details
    pub fn standard(slow_request_threshold: Duration, problems: ProblemDetailBuilder) -> Self {
        Self::new(vec![
            Arc::new(CorrelationStage::new(slow_request_threshold)),
            Arc::new(OutputSanitizationStage::new(problems.clone())),
            Arc::new(SecurityHeadersStage),
            Arc::new(ProblemDetailsStage::new(problems)),
        ])
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub async fn run(&self, request: Request, next: Next) -> Response {
        PipelineNext {
            stages: &self.stages,
            inner: next,
        }
        .run(request)
        .await
    }
}

/// Middleware entry point, installed with `middleware::from_fn_with_state`
pub async fn pipeline_middleware(
    State(pipeline): State<Pipeline>,
    request: Request,
    next: Next,
) -> Response {
    pipeline.run(request, next).await
}

/// Tags each request with a fresh correlation identifier and logs its outcome
pub struct CorrelationStage {
    slow_threshold: Duration,
}

impl CorrelationStage {
    pub fn new(slow_threshold: Duration) -> Self {
        Self { slow_threshold }
    }
}

#[async_trait]
impl PipelineStage for CorrelationStage {
    fn name(&self) -> &'static str {
        "correlation"
    }

    async fn handle(&self, mut request: Request, next: PipelineNext<'_>) -> Response {
        let ctx = CorrelationContext::generate();
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        request.extensions_mut().insert(ctx.clone());

        let span = request_span(&ctx, &method, &path);
        let started = Instant::now();
        let mut response = next.run(request).instrument(span.clone()).await;
        let elapsed = started.elapsed();

        if let Ok(value) = HeaderValue::from_str(ctx.id()) {
            response.headers_mut().insert(CORRELATION_HEADER, value);
        }

        let status = response.status().as_u16();
        let duration_ms = elapsed.as_millis() as u64;
        span.in_scope(|| {
            info!(status, duration_ms, "Request completed");
            if elapsed > self.slow_threshold {
                warn!(
                    status,
                    duration_ms,
                    threshold_ms = self.slow_threshold.as_millis() as u64,
                    "Slow request"
                );
            }
        });

        response
    }
}

fn is_json_content_type(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|media| {
            let media = media.trim();
            media.eq_ignore_ascii_case(JSON_CONTENT_TYPE)
                || media.eq_ignore_ascii_case(PROBLEM_JSON_CONTENT_TYPE)
        })
        .unwrap_or(false)
}

/// HTML-encodes every string in JSON response bodies
pub struct OutputSanitizationStage {
    builder: ProblemDetailBuilder,
}

impl OutputSanitizationStage {
    pub fn new(builder: ProblemDetailBuilder) -> Self {
        Self { builder }
    }
}

#[async_trait]
impl PipelineStage for OutputSanitizationStage {
    fn name(&self) -> &'static str {
        "output-sanitization"
    }

    async fn handle(&self, request: Request, next: PipelineNext<'_>) -> Response {
        let correlation = request.extensions().get::<CorrelationContext>().cloned();
        let response = next.run(request).await;
        if !is_json_content_type(&response) {
            return response;
        }

        let (mut parts, body) = response.into_parts();
        let bytes = match to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to buffer response body for sanitization");
                let problem = self.builder.from_error(
                    &ApiError::unhandled(format!("response body unreadable: {}", e)),
                    correlation.as_ref(),
                    None,
                );
                return problem_response(&problem);
            }
        };

        let document = match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) => sanitize_json_document(&value),
            Err(_) => return Response::from_parts(parts, Body::from(bytes)),
        };
        if !document.was_modified {
            return Response::from_parts(parts, Body::from(bytes));
        }

        match serde_json::to_vec(&document.sanitized) {
            Ok(encoded) => {
                if let Some(details) = &document.details {
                    debug!(details = %details, "Response body sanitized");
                }
                parts.headers.remove(CONTENT_LENGTH);
                Response::from_parts(parts, Body::from(encoded))
            }
            Err(_) => Response::from_parts(parts, Body::from(bytes)),
        }
    }
}

/// Adds browser hardening headers to every response
pub struct SecurityHeadersStage;

fn is_https(request: &Request) -> bool {
    request.uri().scheme_str() == Some("https")
        || request
            .headers()
            .get("x-forwarded-proto")
            .and_then(|value| value.to_str().ok())
            .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false)
}

#[async_trait]
impl PipelineStage for SecurityHeadersStage {
    fn name(&self) -> &'static str {
        "security-headers"
    }

    async fn handle(&self, request: Request, next: PipelineNext<'_>) -> Response {
        let https = is_https(&request);
        let mut response = next.run(request).await;

        let headers = response.headers_mut();
        for (name, value) in SECURITY_HEADERS {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        if https {
            let (name, value) = HSTS_HEADER;
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        response
    }
}

/// Copy headers set further in (CORS, `Allow`) onto a replacement response,
/// leaving the ones the replacement already defines
fn carry_headers(from: &HeaderMap, into: &mut Response) {
    let own: Vec<HeaderName> = into.headers().keys().cloned().collect();
    for (name, value) in from {
        if *name == CONTENT_TYPE || *name == CONTENT_LENGTH || own.contains(name) {
            continue;
        }
        into.headers_mut().append(name.clone(), value.clone());
    }
}

/// Renders typed failures and bare error statuses as problem details
pub struct ProblemDetailsStage {
    builder: ProblemDetailBuilder,
}

impl ProblemDetailsStage {
    pub fn new(builder: ProblemDetailBuilder) -> Self {
        Self { builder }
    }
}

#[async_trait]
impl PipelineStage for ProblemDetailsStage {
    fn name(&self) -> &'static str {
        "problem-details"
    }

    async fn handle(&self, request: Request, next: PipelineNext<'_>) -> Response {
        let correlation = request.extensions().get::<CorrelationContext>().cloned();
        let path = request.uri().path().to_string();

        let mut response = next.run(request).await;

        if let Some(error) = response.extensions_mut().remove::<ApiError>() {
            let problem = self
                .builder
                .from_error(&error, correlation.as_ref(), Some(&path));
            let mut replacement = problem_response(&problem);
            carry_headers(response.headers(), &mut replacement);
            return replacement;
        }

        let status = response.status();
        if (status.is_client_error() || status.is_server_error()) && !is_json_content_type(&response) {
            let reason = status.canonical_reason().unwrap_or("HTTP Error");
            let problem = self
                .builder
                .from_status(status.as_u16(), reason, correlation.as_ref(), Some(&path));
            let mut replacement = problem_response(&problem);
            carry_headers(response.headers(), &mut replacement);
            return replacement;
        }

        response
    }
}
