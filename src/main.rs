//! RunaMitra Record Store Server
//!
//! Local-first backend for the RunaMitra loan app. It owns the on-device
//! record database, serves the UI over HTTP and WebSocket, and pushes
//! unsynced records to the (simulated) cloud whenever connectivity and a
//! trigger line up.

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::{Any, CorsLayer};

use runamitra_server::config::Config;
use runamitra_server::db;
use runamitra_server::middleware;
use runamitra_server::notification::due_date_scanner;
use runamitra_server::routes;
use runamitra_server::state::AppState;
use runamitra_server::store::RecordStore;
use runamitra_server::sync::{Connectivity, SimulatedCloud, SyncEngine};
use runamitra_server::websocket::{self, WsState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        "Starting RunaMitra record store"
    );

    // Open the local database and bootstrap the schema
    let pool = db::create_pool(&config)
        .await
        .context("Failed to open the record store database")?;
    db::init_schema(&pool)
        .await
        .context("Failed to initialize the database schema")?;

    // Sync plumbing: a single-slot trigger channel, the shared
    // connectivity flag, and the event channel collaborators subscribe to.
    // The device is assumed online until the host shell reports otherwise.
    let (sync_tx, sync_rx) = mpsc::channel(1);
    let connectivity = Connectivity::new(true);
    let (events_tx, _events_rx) = broadcast::channel(100);

    let store = Arc::new(RecordStore::new(
        pool.clone(),
        connectivity.clone(),
        sync_tx,
    ));

    // Start the sync worker in the background
    let engine = SyncEngine::new(
        store.clone(),
        SimulatedCloud::new(config.sync_push_delay_ms),
        connectivity.clone(),
        sync_rx,
        events_tx.clone(),
        Duration::from_secs(config.sync_timeout_secs),
        config.sync_retry_base_secs,
    );
    tokio::spawn(engine.run());

    // Start the due-date scanner in the background
    let scanner_store = store.clone();
    let scan_interval = config.notification_scan_interval_secs;
    tokio::spawn(async move {
        due_date_scanner(scanner_store, scan_interval).await;
        tracing::error!("Due-date scanner task exited unexpectedly");
    });

    // Initialize WebSocket state over the event channel
    let ws_state = WsState::new(events_tx);

    // Create shared app state
    let app_state = AppState::new(store, ws_state);

    // Clone pool for the health check
    let health_pool = pool.clone();

    // Create the app router
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(move || health_check(health_pool.clone())))
        .route("/ws", get(websocket::ws_handler))
        .merge(routes::api_router())
        .with_state(app_state)
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(configure_cors(&config));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("WebSocket available at ws://{}/ws", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn root() -> &'static str {
    "RunaMitra Record Store API"
}

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

/// Health check endpoint
async fn health_check(pool: sqlx::SqlitePool) -> axum::Json<HealthResponse> {
    let db_status = match db::check_health(&pool).await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let status = if db_status == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    axum::Json(HealthResponse {
        status: status.to_string(),
        database: db_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn configure_cors(config: &Config) -> CorsLayer {
    match config.cors_allowed_origins.as_deref() {
        None | Some("") => {
            tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
            CorsLayer::permissive()
        }
        Some(allowed) => {
            let origins: Vec<HeaderValue> = allowed
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers(Any)
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
