//! One-shot search endpoint.
//!
//! `POST /api/search` runs a full orchestration call and replies once:
//! `{message, sources}` on success, `{message, key}` on failure. Field
//! validation happens before model resolution, resolution before focus
//! mode lookup, and nothing is invoked for an unknown focus mode.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::AppState;
use crate::config;
use crate::events::keys;
use crate::models::history_from_pairs;
use crate::providers::{list_chat_providers, list_embedding_providers};
use crate::resolver::{self, ModelSelection, ONESHOT_TEMPERATURE, ResolveError};
use crate::search::{self, OptimizationMode, SearchError, SearchReply};

/// Requested chat model, possibly a custom endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatModelBody {
    pub provider: Option<String>,
    pub model: Option<String>,
    #[serde(rename = "customOpenAIBaseURL")]
    pub custom_open_ai_base_url: Option<String>,
    #[serde(rename = "customOpenAIKey")]
    pub custom_open_ai_key: Option<String>,
}

/// Requested embedding model.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingModelBody {
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Request body for the one-shot search endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub focus_mode: Option<String>,
    #[serde(default)]
    pub optimization_mode: OptimizationMode,
    pub chat_model: Option<ChatModelBody>,
    pub embedding_model: Option<EmbeddingModelBody>,
    pub query: Option<String>,
    #[serde(default)]
    pub history: Vec<(String, String)>,
}

/// Error body: human-readable message plus machine-readable key.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub key: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: &str, key: &str) -> ApiError {
    (
        status,
        Json(ErrorBody {
            message: message.to_string(),
            key: key.to_string(),
        }),
    )
}

/// POST /api/search - Run one search and reply once.
pub async fn search_handler(
    State(state): State<AppState>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchReply>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    debug!(request_id = %request_id, "Received search request");

    let (Some(focus_mode), Some(query)) = (body.focus_mode.clone(), body.query.clone()) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Missing focus mode or query",
            keys::INVALID_FORMAT,
        ));
    };

    let history = history_from_pairs(&body.history);
    debug!(count = history.len(), "Processed chat history");

    let cfg = config::snapshot(&state.config).await;
    let (chat_catalog, embedding_catalog) = tokio::join!(
        list_chat_providers(&cfg),
        list_embedding_providers(&cfg)
    );

    let selection = ModelSelection {
        chat_provider: body.chat_model.as_ref().and_then(|m| m.provider.clone()),
        chat_model: body.chat_model.as_ref().and_then(|m| m.model.clone()),
        embedding_provider: body
            .embedding_model
            .as_ref()
            .and_then(|m| m.provider.clone()),
        embedding_model: body.embedding_model.as_ref().and_then(|m| m.model.clone()),
        custom_base_url: body
            .chat_model
            .as_ref()
            .and_then(|m| m.custom_open_ai_base_url.clone()),
        custom_api_key: body
            .chat_model
            .as_ref()
            .and_then(|m| m.custom_open_ai_key.clone()),
    };

    let resolved = resolver::resolve(
        &chat_catalog,
        &embedding_catalog,
        &selection,
        ONESHOT_TEMPERATURE,
    )
    .map_err(|e| match e {
        ResolveError::MissingCustomCredentials => api_error(
            StatusCode::BAD_REQUEST,
            "Missing custom OpenAI base URL or key",
            e.wire_key(),
        ),
        ResolveError::InvalidModelSelection => {
            api_error(StatusCode::BAD_REQUEST, "Invalid model selected", e.wire_key())
        }
    })?;

    let payloads = search::dispatch(
        &state.registry,
        &focus_mode,
        query,
        history,
        resolved.chat,
        resolved.embedding,
        body.optimization_mode,
    )
    .await
    .map_err(|SearchError::InvalidFocusMode(_)| {
        api_error(
            StatusCode::BAD_REQUEST,
            "Invalid focus mode",
            keys::INVALID_FOCUS_MODE,
        )
    })?;

    match search::collect_reply(payloads).await {
        Ok(reply) => Ok(Json(reply)),
        Err(failure) => {
            error!(
                request_id = %request_id,
                error = %failure.message,
                key = %failure.key,
                "Search pipeline failed"
            );
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    message: failure.message,
                    key: failure.key,
                }),
            ))
        }
    }
}
