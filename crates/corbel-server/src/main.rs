//! Corbel audit service
//!
//! Loads the trained artifacts once, then serves the audit page and API.

use anyhow::{Context, Result};
use corbel_lib::{
    health::{components, HealthRegistry},
    narrative::GeminiClient,
    observability::{AuditMetrics, StructuredLogger},
    predictor::{ArtifactLoader, InferencePipeline},
    AuditService,
};
use corbel_server::{api, config::ServiceConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting corbel-audit");

    let config = ServiceConfig::load()?;
    info!(
        listen_addr = %config.listen_addr,
        model_path = ?config.artifacts.paths.model,
        narrative_model = %config.narrative.model,
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::NARRATOR).await;

    let metrics = AuditMetrics::new();
    let logger = StructuredLogger::new("corbel-audit");

    // Artifacts are required; the service does not start without them
    let loader = ArtifactLoader::new(
        config.artifacts.paths.clone(),
        config.artifacts.checksums.clone(),
    );
    let artifacts = match loader.get() {
        Ok(artifacts) => artifacts,
        Err(e) => {
            logger.log_artifact_failure(&e.to_string());
            return Err(e).context("Failed to load trained artifacts");
        }
    };
    health_registry.register(components::ARTIFACTS).await;
    metrics.set_model_version(artifacts.model_version(), artifacts.model().format());
    logger.log_artifacts_loaded(artifacts.model_version(), artifacts.model().format());

    let narrator = GeminiClient::new(config.narrative.gemini_config())?;
    let service = AuditService::new(
        InferencePipeline::new(artifacts),
        Arc::new(narrator),
        config.narrative.language,
        health_registry.clone(),
    );
    logger.log_startup(SERVICE_VERSION, service.model_version(), &config.listen_addr);

    let app_state = Arc::new(api::AppState::new(service, health_registry.clone()));
    health_registry.set_ready(true).await;

    tokio::select! {
        result = api::serve(&config.listen_addr, app_state) => {
            result.context("API server failed")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
            info!("Shutting down");
        }
    }

    Ok(())
}
