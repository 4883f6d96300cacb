//! Router assembly and server startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::api;
use crate::config::{self, SharedConfig};
use crate::search::HandlerRegistry;
use crate::ws;

/// Build the application router with all routes and layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api", get(api_status))
        .route("/api/search", post(api::search::search_handler))
        .route("/api/models", get(api::models::models_handler))
        .route(
            "/api/config",
            get(api::config::get_config).post(api::config::update_config),
        )
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server with the provided configuration and pipelines.
pub async fn start_server(
    config: SharedConfig,
    registry: Arc<HandlerRegistry>,
) -> anyhow::Result<()> {
    let cfg = config::snapshot(&config).await;
    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    drop(cfg);

    let state = AppState::new(config, registry);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// GET /api - Liveness probe.
async fn api_status() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
