//! Web server setup and routing

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::api;
use crate::state::AppState;
use crate::ws;

/// Build the operator API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // API routes
        .route("/api/status", get(api::get_status))
        .route("/api/assets", get(api::list_assets))
        .route("/api/session/start", post(api::start_session))
        .route("/api/session/stop", post(api::stop_session))
        // WebSocket for live status
        .route("/ws", get(ws::websocket_handler))
        // Serve local models
        .nest_service("/models", ServeDir::new(&state.config.daemon.assets_root))
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // State
        .with_state(state)
}

/// Run plain HTTP server
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}
