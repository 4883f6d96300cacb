//! Groq provider loader (OpenAI-compatible endpoint).

use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::{ChatHandle, OpenAiCompatChat};

use super::{CATALOG_TEMPERATURE, ModelMap};

const BASE_URL: &str = "https://api.groq.com/openai";

const CHAT_MODELS: &[(&str, &str)] = &[
    ("llama-3.1-70b-versatile", "Llama 3.1 70B"),
    ("llama-3.1-8b-instant", "Llama 3.1 8B"),
    ("mixtral-8x7b-32768", "Mixtral 8x7B"),
    ("gemma2-9b-it", "Gemma2 9B"),
];

pub async fn chat_models(config: &AppConfig) -> ModelMap<ChatHandle> {
    let Some(key) = &config.providers.groq_api_key else {
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
