//! # Structured Logging
//!
//! Installs the process-wide tracing subscriber and builds the per-request
//! span that carries the correlation identifier into every log line.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Span;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::context::CorrelationContext;

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{0}': {1}")]
    Filter(String, String),

    #[error("Failed to set global subscriber: {0}")]
    Init(String),
}

/// Configuration for the logging system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// The log level or filter directive, used when `RUST_LOG` is unset
    pub level: String,
    /// The service name for identification
    pub service_name: String,
    /// Whether to use JSON formatting on the console
    pub json_format: bool,
    /// Directory for daily-rolling log files
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "feature-votes".to_string(),
            json_format: true,
            log_dir: None,
        }
    }
}

/// Initializes the structured logging system.
///
/// Returns the file writer guard when file output is enabled; the caller
/// must hold it for as long as logs should be flushed. A second call is a
/// no-op.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    // A bad filter must not consume the one-shot flag
    let filter = build_filter(&config.level)?;

    if LOGGING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(None);
    }

    let json_layer = config.json_format.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
    });

    let text_layer = (!config.json_format).then(|| fmt::layer().with_target(true));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            LOGGING_INITIALIZED.store(false, Ordering::SeqCst);
            LoggingError::Init(e.to_string())
        })?;

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        json = config.json_format,
        file_output = config.log_dir.is_some(),
        "Structured logging initialized"
    );

    Ok(guard)
}

/// `RUST_LOG` when set, otherwise the configured level
fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| LoggingError::Filter(level.to_string(), e.to_string())),
    }
}

/// Span covering one request; every event inside it carries `correlation_id`
pub fn request_span(ctx: &CorrelationContext, method: &str, path: &str) -> Span {
    tracing::info_span!(
        "request",
        correlation_id = %ctx.id(),
        method = %method,
        path = %path,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.json_format);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            json_format: false,
            ..LoggingConfig::default()
        };
        if init_logging(&config).is_ok() {
            assert!(init_logging(&config).unwrap().is_none());
        }
    }

    #[test]
    fn test_invalid_level_is_reported_every_time() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "feature_votes=loudest".to_string(),
            ..LoggingConfig::default()
        };

        assert!(matches!(init_logging(&config), Err(LoggingError::Filter(..))));
        assert!(matches!(init_logging(&config), Err(LoggingError::Filter(..))));
    }

    #[test]
    fn test_request_span_builds() {
        let ctx = CorrelationContext::from_id("abc");
        let span = request_span(&ctx, "GET", "/features");
        let _entered = span.enter();
    }
}
