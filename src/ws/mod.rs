//! Persistent WebSocket sessions.
//!
//! A client attaches at `GET /ws` with optional model-selection query
//! parameters. The handshake resolves both model handles before the
//! session is usable; setup failures send a single `error` event and
//! close the connection. Once ready, inbound messages trigger
//! orchestration calls one at a time; see [`session`].

mod session;

pub use session::InboundMessage;

use std::net::SocketAddr;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::AppState;
use crate::resolver::ModelSelection;

/// Model-selection query parameters accepted on connection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub chat_model_provider: Option<String>,
    pub chat_model: Option<String>,
    pub embedding_model_provider: Option<String>,
    pub embedding_model: Option<String>,
    #[serde(rename = "openAIApiKey")]
    pub open_ai_api_key: Option<String>,
    #[serde(rename = "openAIBaseURL")]
    pub open_ai_base_url: Option<String>,
}

impl ConnectParams {
    /// Convert to a resolver selection.
    #[must_use]
    pub fn into_selection(self) -> ModelSelection {
        ModelSelection {
            chat_provider: self.chat_model_provider,
            chat_model: self.chat_model,
            embedding_provider: self.embedding_model_provider,
            embedding_model: self.embedding_model,
            custom_base_url: self.open_ai_base_url,
            custom_api_key: self.open_ai_api_key,
        }
    }
}

/// GET /ws - Upgrade to a session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session::run(socket, params, peer, state))
}
