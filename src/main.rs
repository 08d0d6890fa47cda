// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{routing::get, Router};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::generation_repository::GenerationMixRepository;
use crate::application::intensity_service::{CarbonIntensityService, IntensityCache};
use crate::domain::emissions::FactorRegistry;
use crate::infrastructure::config::{load_app_config, Backend};
use crate::infrastructure::influx_repository::InfluxRepository;
use crate::infrastructure::memory_repository::MemoryRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    carbon_intensity_factors, daily_intensity, daily_intensity_by, health_check,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config().context("Failed to load config/grid_carbon")?;

    // Resolve emissions factors once; shared read-only from here on
    let registry = Arc::new(FactorRegistry::resolve_all()?);

    // Create repository (infrastructure layer)
    let repository: Arc<dyn GenerationMixRepository> = match config.datastore.backend {
        Backend::Influx => Arc::new(InfluxRepository::new(
            config.datastore.host.clone(),
            config.datastore.token.clone(),
            config.datastore.database.clone(),
            config.datastore.table_template.clone(),
        )),
        Backend::Csv => Arc::new(MemoryRepository::load_dir(&config.datastore.dataset_dir)?),
    };

    // Create services (application layer)
    let cache = Arc::new(IntensityCache::new(config.cache.policy()));
    let intensity_service = CarbonIntensityService::new(
        repository,
        registry,
        cache,
        config.datastore.query_timeout(),
    );

    let state = Arc::new(AppState { intensity_service });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/:utility/daily_intensity", get(daily_intensity))
        .route("/:utility/daily_intensity/:granularity", get(daily_intensity_by))
        .route("/:utility/carbon_intensity_factors", get(carbon_intensity_factors))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting grid-carbon service on {} ({:?} backend)", addr, config.datastore.backend);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
