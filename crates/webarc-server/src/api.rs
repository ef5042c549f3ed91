//! Router assembly and the serve loop

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::{net::SocketAddr, time::Duration};
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

use crate::config::Config;
use crate::features::{self, files, AppState};
use crate::middleware;

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    // Container bytes are served as-is; only API replies are compressed.
    let api_routes = features::router(state.clone()).layer(CompressionLayer::new());

    Router::new()
        .route("/health", get(health_check))
        .nest("/files", files::files_routes())
        .with_state(state)
        .nest("/api/v1", api_routes)
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> Response {
    let dirs = state.archive.storage_dirs();
    let mut available = 0;
    for dir in dirs {
        if tokio::fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            available += 1;
        }
    }

    if available == 0 {
        tracing::error!("No storage directory is available");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "storage_dirs": dirs.len(),
                "available": 0
            })),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "storage_dirs": dirs.len(),
            "available": available
        })),
    )
        .into_response()
}

/// Bind and serve until Ctrl+C or SIGTERM
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(&config.engine);
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Archive node listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
