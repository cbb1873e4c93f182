/*!
 * HTTP service exposing the parse and translate operations.
 *
 * - `POST /api/parse-subtitle`: multipart upload, file field `subtitleFile`
 * - `POST /api/translate-subtitles`: JSON `{ subtitles, targetLang }`
 * - `GET /health`: liveness probe
 */

use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;

use crate::app_controller::Controller;

pub mod handlers;
pub mod routes;

pub use self::routes::create_router;

/// Shared state of the HTTP service
#[derive(Debug)]
pub struct AppState {
    pub controller: Controller,
}

impl AppState {
    pub fn new(controller: Controller) -> Self {
        Self { controller }
    }
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(controller: Controller) -> Result<()> {
    let addr = format!("{}:{}", controller.config().server.host, controller.config().server.port);
    let app = create_router(Arc::new(AppState::new(controller)));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
