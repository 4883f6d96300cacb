//! OpenAI provider loader.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::{ChatHandle, EmbeddingHandle, OpenAiCompatChat, OpenAiCompatEmbeddings};

use super::{CATALOG_TEMPERATURE, ModelMap};

const BASE_URL: &str = "https://api.openai.com";

const CHAT_MODELS: &[(&str, &str)] = &[
    ("gpt-3.5-turbo", "GPT-3.5 Turbo"),
    ("gpt-4", "GPT-4"),
    ("gpt-4-turbo", "GPT-4 Turbo"),
    ("gpt-4o", "GPT-4 Omni"),
    ("gpt-4o-mini", "GPT-4 Omni Mini"),
];

const EMBEDDING_MODELS: &[(&str, &str)] = &[
    ("text-embedding-3-small", "Text Embedding 3 Small"),
    ("text-embedding-3-large", "Text Embedding 3 Large"),
];

pub async fn chat_models(config: &AppConfig) -> ModelMap<ChatHandle> {
    let Some(key) = &config.providers.openai_api_key else {
        return ModelMap::new();
    };

    CHAT_MODELS
        .iter()
        .map(|(name, display)| {
            let handle: ChatHandle = Arc::new(OpenAiCompatChat::new(
                BASE_URL,
                Some(key.clone()),
                *name,
                CATALOG_TEMPERATURE,
            ));
            (
                (*name).to_string(),
                super::ModelDescriptor {
                    display_name: (*display).to_string(),
                    handle,
                },
            )
        })
        .collect()
}

pub async fn embedding_models(config: &AppConfig) -> ModelMap<EmbeddingHandle> {
    let Some(key) = &config.providers.openai_api_key else {
        return ModelMap::new();
    };

    EMBEDDING_MODELS
        .iter()
        .map(|(name, display)| {
            let handle: EmbeddingHandle = Arc::new(OpenAiCompatEmbeddings::new(
                BASE_URL,
                Some(key.clone()),
                *name,
            ));
            (
                (*name).to_string(),
                super::ModelDescriptor {
                    display_name: (*display).to_string(),
                    handle,
                },
            )
        })
        .collect()
}
