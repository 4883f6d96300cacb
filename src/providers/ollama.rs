//! Ollama provider loader.
//!
//! Unlike the hosted providers, the model list is dynamic: the loader
//! probes the runtime's `/api/tags` endpoint on every catalog build, so
//! models appear as they are pulled and the whole provider vanishes when
//! the runtime is unreachable.

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::config::AppConfig;
use crate::models::{ChatHandle, EmbeddingHandle, OpenAiCompatChat, OpenAiCompatEmbeddings};

use super::{CATALOG_TEMPERATURE, ModelMap};

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<InstalledModel>,
}

#[derive(Debug, Deserialize)]
struct InstalledModel {
    name: String,
}

async fn installed_models(base_url: &str) -> anyhow::Result<Vec<String>> {
    let url = format!("{}/api/tags", base_url.trim_end_matches('/'));
    let resp = reqwest::get(&url)
        .await?
        .error_for_status()?
        .json::<TagsResponse>()
        .await?;
    Ok(resp.models.into_iter().map(|m| m.name).collect())
}

pub async fn chat_models(config: &AppConfig) -> ModelMap<ChatHandle> {
    let Some(url) = &config.providers.ollama_api_url else {
        return ModelMap::new();
    };

    match installed_models(url).await {
        Ok(names) => names
            .into_iter()
            .map(|name| {
                let handle: ChatHandle = Arc::new(OpenAiCompatChat::new(
                    url.clone(),
                    None,
                    name.clone(),
                    CATALOG_TEMPERATURE,
                ));
                (
                    name.clone(),
                    super::ModelDescriptor {
                        display_name: name,
                        handle,
                    },
                )
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, url = %url, "Ollama runtime unreachable, no chat models listed");
            ModelMap::new()
        }
    }
}

pub async fn embedding_models(config: &AppConfig) -> ModelMap<EmbeddingHandle> {
    let Some(url) = &config.providers.ollama_api_url else {
        return ModelMap::new();
    };

    match installed_models(url).await {
        Ok(names) => names
            .into_iter()
            .map(|name| {
                let handle: EmbeddingHandle = Arc::new(OpenAiCompatEmbeddings::new(
                    url.clone(),
                    None,
                    name.clone(),
                ));
                (
                    name.clone(),
                    super::ModelDescriptor {
                        display_name: name,
                        handle,
                    },
                )
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, url = %url, "Ollama runtime unreachable, no embedding models listed");
            ModelMap::new()
        }
    }
}
