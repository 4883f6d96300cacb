//! Model listing endpoint.
//!
//! `GET /api/models` returns the current catalog snapshot with model
//! handles stripped: provider key, model key, display name only.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;
use crate::config;
use crate::providers::{ProviderMap, list_chat_providers, list_embedding_providers};

/// A model entry without its handle.
#[derive(Debug, Clone, Serialize)]
pub struct ListedModel {
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// Provider key → model key → display name.
pub type ListedProviders = BTreeMap<String, BTreeMap<String, ListedModel>>;

/// Response for the model listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub chat_model_providers: ListedProviders,
    pub embedding_model_providers: ListedProviders,
}

pub(crate) fn strip_handles<H>(catalog: &ProviderMap<H>) -> ListedProviders {
    catalog
        .iter()
        .map(|(provider, models)| {
            let listed = models
                .iter()
                .map(|(name, descriptor)| {
                    (
                        name.clone(),
                        ListedModel {
                            display_name: descriptor.display_name.clone(),
                        },
                    )
                })
                .collect();
            (provider.clone(), listed)
        })
        .collect()
}

/// GET /api/models - List selectable providers and models.
pub async fn models_handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    let cfg = config::snapshot(&state.config).await;
    let (chat_catalog, embedding_catalog) = tokio::join!(
        list_chat_providers(&cfg),
        list_embedding_providers(&cfg)
    );

    Json(ModelsResponse {
        chat_model_providers: strip_handles(&chat_catalog),
        embedding_model_providers: strip_handles(&embedding_catalog),
    })
}
