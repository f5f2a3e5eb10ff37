//! config-rs/lib.rs
//! Configuration for the feature votes service.
//! Settings come from built-in defaults, an optional `.env` file and
//! `FEATURE_VOTES_*` environment variables, in that order of precedence.

use std::env;
use std::net::SocketAddr;

use config::{Config, Environment};
use serde::Deserialize;
use thiserror::Error;

/// Name used to derive the `<NAME>_SERVICE_ADDR` / `<NAME>_SERVICE_PORT` variables
pub const SERVICE_ENV_NAME: &str = "FEATURE_VOTES";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Runtime settings for the service
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Name reported by `/health` and attached to logs
    pub service_name: String,
    /// Base log level, overridden by `RUST_LOG` when set
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable text
    pub log_json: bool,
    /// Directory for daily-rolling log files; console only when unset
    pub log_dir: Option<String>,
    /// Requests slower than this are logged at warn level
    pub slow_request_threshold_ms: u64,
    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
    /// Seed the in-memory store with a sample feature at startup
    pub seed_demo_data: bool,
    /// Prefix for the `type` URI of problem-detail responses
    pub problem_type_base: String,
    /// Comma-separated list of origins allowed by CORS
    pub cors_allowed_origins: String,
    #[serde(skip, default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

impl ServiceConfig {
    /// Load configuration for the service, reading `.env` first if present
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenv::dotenv().is_ok() {
            log::debug!("Loaded environment overrides from .env");
        }
        let mut config = Self::from_prefix(SERVICE_ENV_NAME)?;
        config.bind_address = get_bind_address(SERVICE_ENV_NAME, DEFAULT_PORT);
        Ok(config)
    }

    /// Load configuration from variables named `<PREFIX>_<FIELD>`
    pub fn from_prefix(prefix: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("service_name", "feature-votes")?
            .set_default("log_level", "info")?
            .set_default("log_json", true)?
            .set_default("slow_request_threshold_ms", 200_i64)?
            .set_default("max_body_bytes", 1_048_576_i64)?
            .set_default("seed_demo_data", true)?
            .set_default("problem_type_base", "https://feature-votes.example/problems/")?
            .set_default("cors_allowed_origins", "http://localhost:3000")?
            .add_source(Environment::with_prefix(prefix).try_parsing(true))
            .build()?;

        let config: ServiceConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_body_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.problem_type_base.ends_with('/') {
            return Err(ConfigError::Invalid {
                field: "problem_type_base",
                reason: "must end with '/'".to_string(),
            });
        }
        Ok(())
    }

    /// CORS origins as individual trimmed entries
    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Get service port from environment variables with proper fallback
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "FEATURE_VOTES")
/// * `default_port` - The default port to use if not specified in environment
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    match env::var(&var_name) {
        Ok(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
            log::warn!("Invalid port in {}, using default {}", var_name, default_port);
            default_port
        }),
        Err(_) => default_port,
    }
}

/// Create a SocketAddr for binding a service
///
/// `<NAME>_SERVICE_ADDR` may hold `host:port` or `http(s)://host:port`;
/// otherwise the service binds all interfaces on `<NAME>_SERVICE_PORT`.
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    if let Ok(addr_str) = env::var(&var_name) {
        let stripped = addr_str
            .strip_prefix("http://")
            .or_else(|| addr_str.strip_prefix("https://"))
            .unwrap_or(&addr_str);
        if let Ok(addr) = stripped.parse::<SocketAddr>() {
            return addr;
        }
        log::warn!("Invalid address format in {}, using default", var_name);
    }

    let port = get_service_port(service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}
