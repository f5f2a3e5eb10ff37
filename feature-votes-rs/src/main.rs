// feature-votes-rs/src/main.rs
// Feature Votes - REST service for proposing and voting on features
// Port 8000 - HTTP entry point for external clients

use anyhow::Context;
use config_rs::ServiceConfig;
use error_handling_rs::{init_logging, LoggingConfig};
use feature_votes::{audit_secrets, create_router, AppState, RouterSettings};
use secrets_rs::SecretClassifier;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("failed to load service configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&LoggingConfig {
        level: config.log_level.clone(),
        service_name: config.service_name.clone(),
        json_format: config.log_json,
        log_dir: config.log_dir.clone(),
    })?;

    let secrets = SecretClassifier::new();
    audit_secrets(&secrets).context("secret configuration rejected")?;

    let state = AppState::from_config(&config);
    let app = create_router(state, &RouterSettings::from(&config));

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;

    info!(
        address = %config.bind_address,
        service = %config.service_name,
        seeded = config.seed_demo_data,
        "Feature votes service listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
