//! HTTP server for codescribe.
//!
//! Exposes ingestion and question answering over a small JSON API.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::assistant::Assistant;

pub use handlers::router;

/// Shared application state for HTTP handlers
pub struct AppState {
    pub assistant: Assistant,
    /// Cancelled on shutdown; each request runs under a child token
    pub shutdown: CancellationToken,
}

/// Run the HTTP server on the given port until `shutdown` fires
pub async fn run_server(assistant: Assistant, port: u16, shutdown: CancellationToken) -> Result<()> {
    let state = Arc::new(AppState {
        assistant,
        shutdown: shutdown.clone(),
    });

    let app = handlers::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("codescribe HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server error")?;

    Ok(())
}
