//! Feature votes HTTP service.
//!
//! Routes are plain axum handlers; cross-cutting behaviour (correlation
//! identifiers, problem-detail errors, output encoding, security headers)
//! lives in the [`pipeline`] installed around them.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use config_rs::ServiceConfig;
use error_handling_rs::{ApiError, ProblemDetailBuilder};
use secrets_rs::{SecretClassifier, SecretError};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod store;

use error::HandlerError;
use pipeline::{pipeline_middleware, Pipeline};
use store::{FeatureStore, InMemoryFeatureStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FeatureStore>,
    pub service_name: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn FeatureStore>, service_name: &str) -> Self {
        Self {
            store,
            service_name: service_name.into(),
        }
    }

    /// State backed by the in-memory store, seeded when configured
    pub fn from_config(config: &ServiceConfig) -> Self {
        let store = if config.seed_demo_data {
            InMemoryFeatureStore::with_demo_data()
        } else {
            InMemoryFeatureStore::new()
        };
        Self::new(Arc::new(store), &config.service_name)
    }
}

/// Settings that shape the middleware stack
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub slow_request_threshold: Duration,
    pub max_body_bytes: usize,
    pub problem_type_base: String,
    pub allowed_origins: Vec<String>,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            slow_request_threshold: Duration::from_millis(200),
            max_body_bytes: 1024 * 1024,
            problem_type_base: error_handling_rs::DEFAULT_PROBLEM_TYPE_BASE.to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl From<&ServiceConfig> for RouterSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            slow_request_threshold: Duration::from_millis(config.slow_request_threshold_ms),
            max_body_bytes: config.max_body_bytes,
            problem_type_base: config.problem_type_base.clone(),
            allowed_origins: config.allowed_origins(),
        }
    }
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    HandlerError(ApiError::unhandled(format!("handler panicked: {}", message))).into_response()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any)
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState, settings: &RouterSettings) -> Router {
    let pipeline = Pipeline::standard(
        settings.slow_request_threshold,
        ProblemDetailBuilder::new(settings.problem_type_base.clone()),
    );
    info!(stages = ?pipeline.stage_names(), "Request pipeline configured");

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/features",
            get(handlers::list_features).post(handlers::create_feature),
        )
        .route("/features/top", get(handlers::top_features))
        .route(
            "/features/:id",
            get(handlers::get_feature)
                .put(handlers::update_feature)
                .delete(handlers::delete_feature),
        )
        .route("/features/:id/vote", axum::routing::post(handlers::vote_feature))
        .fallback(handlers::not_found)
        .with_state(state)
        // Innermost first: panics, oversized bodies and CORS preflights all
        // pass through the pipeline
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(RequestBodyLimitLayer::new(settings.max_body_bytes))
        .layer(cors_layer(&settings.allowed_origins))
        .layer(middleware::from_fn_with_state(pipeline, pipeline_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Check the service secrets at startup.
///
/// Missing secrets only warn; an encryption key that is present but too
/// short stops the service.
pub fn audit_secrets(secrets: &SecretClassifier) -> Result<(), SecretError> {
    if let Err(err) = secrets.jwt_secret() {
        warn!(error = %err, "JWT signing secret unavailable");
    }
    if let Err(err) = secrets.db_password() {
        warn!(error = %err, "Database password unavailable");
    }
    match secrets.encryption_key() {
        Ok(_) => Ok(()),
        Err(err @ SecretError::Missing(_)) => {
            warn!(error = %err, "Encryption key unavailable");
            Ok(())
        }
        Err(err) => Err(err),
    }
}
