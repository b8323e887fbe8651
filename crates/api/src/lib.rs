//! Telemetry API Server
//!
//! HTTP boundary for sensor ingestion, read queries, and threshold
//! management. Translates core error kinds into status codes; holds no
//! business logic of its own.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod config;
mod error;
mod routes;

pub use error::ApiError;

use crate::config::Settings;
use ingest::IngestHandler;
use query_engine::QueryEngine;
use storage::Store;
use threshold_cache::ThresholdCache;

/// Application state shared across handlers
pub struct AppState {
    /// Persistent store, shared with the handlers below
    pub store: Arc<Store>,
    /// Ingestion handler
    pub ingest: IngestHandler,
    /// Read-side query engine
    pub query: QueryEngine,
    /// Loaded threshold cache
    pub thresholds: ThresholdCache,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state around an initialized store
    pub fn new(store: Arc<Store>, thresholds: ThresholdCache) -> Self {
        Self {
            ingest: IngestHandler::new(store.clone()),
            query: QueryEngine::new(store.clone()),
            store,
            thresholds,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/sensor-data", post(routes::readings::receive))
        .route("/api/latest-data", get(routes::readings::latest))
        .route("/api/history", get(routes::readings::history))
        .route(
            "/api/thresholds",
            get(routes::thresholds::current).post(routes::thresholds::update),
        )
        .route("/api/stats", get(routes::stats::summary))
        .route("/api/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Initialize logging
pub fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Open the store, load the threshold cache, and serve until shutdown
pub async fn run_server(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(
        Store::open(&settings.database.path, settings.database.max_connections).await?,
    );
    store.initialize().await?;

    let thresholds = ThresholdCache::new();
    let loaded = thresholds.load(&store).await?;
    info!("Current thresholds: {:?}", loaded);

    let state = Arc::new(AppState::new(store, thresholds));
    let app = create_router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
