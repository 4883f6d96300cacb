//! Provider catalog construction.
//!
//! A catalog is a point-in-time, read-only snapshot of the providers and
//! models that are currently usable, rebuilt for every request and every
//! new connection: providers appear and disappear as credentials change
//! and local runtimes come and go. Each provider's contribution is loaded
//! independently; a failing loader degrades to an empty contribution and
//! never aborts the others.
//!
//! Catalogs are `BTreeMap`s, so iteration order (and therefore default
//! provider/model selection) is lexical: arbitrary, but stable and
//! repeatable across processes.

pub mod anthropic;
pub mod groq;
pub mod local;
pub mod ollama;
pub mod openai;

use std::collections::BTreeMap;

use crate::config::AppConfig;
use crate::models::{ChatHandle, EmbeddingHandle};

/// Synthetic chat provider key for caller-supplied endpoints.
///
/// Always present in the chat catalog with an empty model set: selectable,
/// but resolved from the caller's endpoint + credential instead of a
/// catalog lookup.
pub const CUSTOM_OPENAI: &str = "custom_openai";

/// Temperature for catalog-constructed chat handles.
const CATALOG_TEMPERATURE: f32 = 0.7;

/// A selectable model: display name plus a ready-to-invoke handle.
#[derive(Clone)]
pub struct ModelDescriptor<H> {
    /// Human-readable name shown in model listings.
    pub display_name: String,
    /// Instantiated model handle.
    pub handle: H,
}

impl<H> std::fmt::Debug for ModelDescriptor<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Model key → descriptor.
pub type ModelMap<H> = BTreeMap<String, ModelDescriptor<H>>;

/// Provider key → model map.
pub type ProviderMap<H> = BTreeMap<String, ModelMap<H>>;

/// Catalog of chat models.
pub type ChatCatalog = ProviderMap<ChatHandle>;

/// Catalog of embedding models.
pub type EmbeddingCatalog = ProviderMap<EmbeddingHandle>;

/// List all currently usable chat providers.
pub async fn list_chat_providers(config: &AppConfig) -> ChatCatalog {
    let mut catalog = ChatCatalog::new();

    insert_nonempty(&mut catalog, "openai", openai::chat_models(config).await);
    insert_nonempty(
        &mut catalog,
        "anthropic",
        anthropic::chat_models(config).await,
    );
    insert_nonempty(&mut catalog, "groq", groq::chat_models(config).await);
    insert_nonempty(&mut catalog, "ollama", ollama::chat_models(config).await);

    catalog.insert(CUSTOM_OPENAI.to_string(), ModelMap::new());

    catalog
}

/// List all currently usable embedding providers.
pub async fn list_embedding_providers(config: &AppConfig) -> EmbeddingCatalog {
    let mut catalog = EmbeddingCatalog::new();

    insert_nonempty(
        &mut catalog,
        "openai",
        openai::embedding_models(config).await,
    );
    insert_nonempty(
        &mut catalog,
        "ollama",
        ollama::embedding_models(config).await,
    );
    insert_nonempty(&mut catalog, "local", local::embedding_models().await);

    catalog
}

fn insert_nonempty<H>(catalog: &mut ProviderMap<H>, key: &str, models: ModelMap<H>) {
    if !models.is_empty() {
        catalog.insert(key.to_string(), models);
    }
}
