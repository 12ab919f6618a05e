//! HTTP server wiring for Streamgate.
//!
//! Builds the router over an injected media backend and runs the listening
//! socket. The backend handle is the only process-wide resource: an `Arc`
//! shared read-only across all concurrent sessions.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use streamgate_core::backend::MediaBackend;
use streamgate_core::config::StreamgateConfig;
use tracing::info;

use crate::handlers::{liveness, stream_media, stream_preflight};

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn MediaBackend>,
    pub config: StreamgateConfig,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route(
            "/stream/{container_id}/{object_id}",
            get(stream_media).options(stream_preflight),
        )
        .with_state(state)
}

/// Runs the server until the listener fails.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or the server loop fails.
pub async fn run_server(
    config: StreamgateConfig,
    backend: Arc<dyn MediaBackend>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let public_base_url = config.server.public_base_url.clone();

    let app = router(AppState { backend, config });

    info!("streamgate serving on http://{addr}");
    info!("stream URL template: {public_base_url}/stream/{{container_id}}/{{object_id}}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
