//! Configuration endpoint.
//!
//! `GET /api/config` exposes the current provider credentials plus the
//! selectable models per provider. `POST /api/config` installs a new
//! configuration snapshot; subsequent catalog builds see it immediately.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;
use crate::config::{self, ProviderUpdate};
use crate::providers::{list_chat_providers, list_embedding_providers};

/// A model entry in the config listing.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigModel {
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// Response for the config listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub chat_model_providers: BTreeMap<String, Vec<ConfigModel>>,
    pub embedding_model_providers: BTreeMap<String, Vec<ConfigModel>>,
    pub openai_api_key: Option<String>,
    pub ollama_api_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub groq_api_key: Option<String>,
}

/// Request body for a config update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub openai_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub ollama_api_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub message: String,
}

fn to_listing<H>(models: &crate::providers::ModelMap<H>) -> Vec<ConfigModel> {
    models
        .iter()
        .map(|(name, d)| ConfigModel {
            name: name.clone(),
            display_name: d.display_name.clone(),
        })
        .collect()
}

/// GET /api/config - Current credentials and selectable models.
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let cfg = config::snapshot(&state.config).await;
    let (chat_catalog, embedding_catalog) = tokio::join!(
        list_chat_providers(&cfg),
        list_embedding_providers(&cfg)
    );

    Json(ConfigResponse {
        chat_model_providers: chat_catalog
            .iter()
            .map(|(p, models)| (p.clone(), to_listing(models)))
            .collect(),
        embedding_model_providers: embedding_catalog
            .iter()
            .map(|(p, models)| (p.clone(), to_listing(models)))
            .collect(),
        openai_api_key: cfg.providers.openai_api_key.clone(),
        ollama_api_url: cfg.providers.ollama_api_url.clone(),
        anthropic_api_key: cfg.providers.anthropic_api_key.clone(),
        groq_api_key: cfg.providers.groq_api_key.clone(),
    })
}

/// POST /api/config - Install a new configuration snapshot.
pub async fn update_config(
    State(state): State<AppState>,
    Json(body): Json<UpdateRequest>,
) -> Json<UpdateResponse> {
    let current = config::snapshot(&state.config).await;
    let next = current.with_provider_update(ProviderUpdate {
        openai_api_key: body.openai_api_key,
        groq_api_key: body.groq_api_key,
        anthropic_api_key: body.anthropic_api_key,
        ollama_api_url: body.ollama_api_url,
    });
    config::install(&state.config, next).await;

    info!("Provider configuration updated");
    Json(UpdateResponse {
        message: "Config updated".to_string(),
    })
}
