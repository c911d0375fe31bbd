//! # HTTP Surface
//!
//! Serves the upload page and a JSON API over the session pipeline.
//!
//! | Route | Purpose |
//! |---|---|
//! | `GET /` | Upload page |
//! | `GET /health` | Liveness probe |
//! | `POST /api/process` | Runs the pipeline over every uploaded file |
//! | `POST /api/convert` | Converts one file and returns the artifact bytes |
//!
//! Requests carry the file bytes and their options every time; the server
//! keeps no table state between requests.
use crate::session::Settings;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

mod error;
mod handlers;

pub use error::ApiError;

/// Default upload limit in megabytes
pub const DEFAULT_MAX_UPLOAD_MB: usize = 200;

/// Listener and request limits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Maximum request body size in bytes
    pub max_upload_bytes: usize,
    pub settings: Settings,
}

/// Shared request state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub settings: Arc<Settings>,
}

/// Builds the application router.
pub fn router(settings: Settings, max_upload_bytes: usize) -> Router {
    let state = AppState {
        settings: Arc::new(settings),
    };
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/process", post(handlers::process))
        .route("/api/convert", post(handlers::convert))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Binds the listener and serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let app = router(config.settings, config.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
