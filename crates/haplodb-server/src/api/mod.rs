//! HTTP API assembly
//!
//! Builds the axum router, owns the shared application state, and runs the
//! server with graceful shutdown. Endpoints are mounted at the root (no
//! version prefix): the upload/poll/download routes from `features`, plus a
//! service banner and a health probe.

pub mod response;

use crate::config::Config;
use crate::db;
use crate::features::{self, FeatureState};
use crate::ingest::{self, JobRegistry};
use crate::middleware;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tracing::info;

/// Run the server until shutdown: connect the pool, apply migrations, start
/// the job registry sweeper, and serve the router. On shutdown, in-flight
/// requests get `server.shutdown_timeout_secs` to drain before the process
/// gives up on them.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config.database).await?;
    info!("Database connection pool established");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    let registry = JobRegistry::new();
    let _sweeper = ingest::spawn_sweeper(
        registry.clone(),
        Duration::from_secs(config.jobs.sweep_interval_secs),
        chrono::Duration::minutes(config.jobs.retention_minutes as i64),
    );

    let state = FeatureState {
        db: pool,
        jobs: registry,
    };
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    let drain_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    info!(
        "Draining in-flight requests (up to {}s)",
        drain_timeout.as_secs()
    );
    await_drain(server, drain_timeout).await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Wait for the draining server task, aborting whatever remains once the
/// timeout elapses.
async fn await_drain(
    mut server: tokio::task::JoinHandle<std::io::Result<()>>,
    timeout: Duration,
) -> anyhow::Result<()> {
    match tokio::time::timeout(timeout, &mut server).await {
        Ok(joined) => {
            joined??;
            Ok(())
        }
        Err(_) => {
            tracing::warn!(
                "Drain timeout of {}s elapsed; aborting remaining connections",
                timeout.as_secs()
            );
            server.abort();
            Ok(())
        }
    }
}

/// Build the full router with the middleware stack applied.
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check).with_state(state.clone()))
        .merge(features::router(state))
        // Layers apply innermost first
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Service banner
async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "HaploDB Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Liveness plus database connectivity probe
async fn health_check(State(state): State<FeatureState>) -> Result<Response, StatusCode> {
    match db::health_check(&state.db).await {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Resolves when the process receives ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .unwrap_or_else(|e| tracing::error!("Failed to install ctrl-c handler: {}", e));
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl-c, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
