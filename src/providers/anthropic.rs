//! Anthropic provider loader.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::{AnthropicChat, ChatHandle};

use super::{CATALOG_TEMPERATURE, ModelMap};

const CHAT_MODELS: &[(&str, &str)] = &[
    ("claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet"),
    ("claude-3-5-haiku-20241022", "Claude 3.5 Haiku"),
    ("claude-3-opus-20240229", "Claude 3 Opus"),
    ("claude-3-haiku-20240307", "Claude 3 Haiku"),
];

pub async fn chat_models(config: &AppConfig) -> ModelMap<ChatHandle> {
    let Some(key) = &config.providers.anthropic_api_key else {
        return ModelMap::new();
    };

    CHAT_MODELS
        .iter()
        .map(|(name, display)| {
            let handle: ChatHandle =
                Arc::new(AnthropicChat::new(key.clone(), *name, CATALOG_TEMPERATURE));
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
