pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use review_import_core::scheduler::fsrs::Fsrs;
use review_import_core::{get_scheduler, Scheduler};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::db::Database;
use crate::services::import::ImportOrchestrator;
use crate::services::resolution::{ItemResolutionAdapter, ResolutionCache};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub importer: Arc<ImportOrchestrator>,
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/users/:user_id/import", post(routes::import::import))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Pick the scheduler named in the config.
pub fn build_scheduler(config: &AppConfig) -> anyhow::Result<Arc<dyn Scheduler>> {
    match config.scheduler.as_str() {
        "fsrs" => Ok(Arc::new(Fsrs::with_retention(config.desired_retention))),
        other => get_scheduler(other)
            .map(Arc::from)
            .with_context(|| format!("unknown scheduler `{other}`")),
    }
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Arc::new(Database::connect(&config.database_url).await?);

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    let cache = Arc::new(ResolutionCache::new());
    let resolver = Arc::new(ItemResolutionAdapter::new(
        db.clone(),
        cache.clone(),
        config.import.resolution_batch_size,
        config.import.max_concurrency,
    ));
    let scheduler = build_scheduler(&config)?;
    tracing::info!(scheduler = scheduler.name(), "Scheduler ready");

    let importer = Arc::new(ImportOrchestrator::new(
        db,
        resolver,
        scheduler,
        &config.import,
    ));
    let app = build_router(AppState { importer });

    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache.close().await;
    tracing::info!("Resolution cache closed, shutting down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn health_check() -> &'static str {
    "OK"
}
