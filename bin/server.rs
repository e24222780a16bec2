// Ledger Sync - Status Server
// Runs the sync scheduler in the background and serves its progress over HTTP

use anyhow::{Context, Result};
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use ledger_sync::{build_scheduler, Config, StatusBoard, SyncStatus, VERSION};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/status - Tick counter and the last tick's pass outcomes
async fn get_status(State(status): State<StatusBoard>) -> Json<ApiResponse<SyncStatus>> {
    Json(ApiResponse::ok(status.snapshot().await))
}

fn router(status: StatusBoard) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .with_state(status);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(version = VERSION, "ledger-sync status server starting");

    let config = Config::from_env().context("Failed to load configuration")?;
    let scheduler = build_scheduler(&config)?;
    let status = scheduler.status();

    let sync_task = tokio::spawn(scheduler.run_until(std::future::pending::<()>()));

    let listener = tokio::net::TcpListener::bind(&config.status_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.status_addr))?;
    tracing::info!(addr = %config.status_addr, "Status API: http://{}/api/status", config.status_addr);

    axum::serve(listener, router(status))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Status server failed")?;

    sync_task.abort();
    tracing::info!("ledger-sync status server shut down cleanly");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
