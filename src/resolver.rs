//! Model resolution.
//!
//! Turns a requested provider/model selection (possibly empty) plus the
//! current catalog snapshot into a pair of concrete handles, or a typed
//! failure. Resolution happens once per request/connection; everything
//! downstream depends only on the handles.

use std::sync::Arc;

use crate::models::{ChatHandle, EmbeddingHandle, OpenAiCompatChat};
use crate::providers::{CUSTOM_OPENAI, ChatCatalog, EmbeddingCatalog};

/// Temperature for custom-endpoint handles built for one-shot requests.
pub const ONESHOT_TEMPERATURE: f32 = 0.3;

/// Temperature for custom-endpoint handles built for persistent sessions.
pub const SESSION_TEMPERATURE: f32 = 0.7;

/// Typed resolution failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The requested (provider, model) pair does not resolve to a handle.
    #[error("invalid chat or embedding model selected")]
    InvalidModelSelection,
    /// `custom_openai` was selected without both endpoint and credential.
    #[error("missing custom OpenAI base URL or key")]
    MissingCustomCredentials,
}

impl ResolveError {
    /// Symbolic key for the wire protocol.
    #[must_use]
    pub fn wire_key(self) -> &'static str {
        match self {
            Self::InvalidModelSelection => crate::events::keys::INVALID_MODEL_SELECTED,
            Self::MissingCustomCredentials => crate::events::keys::MISSING_CUSTOM_CREDENTIALS,
        }
    }
}

/// A requested model selection. All fields optional; absent axes default
/// to the first provider/model in catalog iteration order.
#[derive(Debug, Default, Clone)]
pub struct ModelSelection {
    pub chat_provider: Option<String>,
    pub chat_model: Option<String>,
    pub embedding_provider: Option<String>,
    pub embedding_model: Option<String>,
    /// Base URL for the `custom_openai` provider.
    pub custom_base_url: Option<String>,
    /// Credential for the `custom_openai` provider.
    pub custom_api_key: Option<String>,
}

/// The outcome of a successful resolution.
#[derive(Clone)]
pub struct ResolvedModels {
    pub chat: ChatHandle,
    pub embedding: EmbeddingHandle,
}

impl std::fmt::Debug for ResolvedModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModels").finish_non_exhaustive()
    }
}

/// Resolve a selection against catalog snapshots.
///
/// `custom_temperature` applies only to freshly built custom-endpoint
/// handles ([`ONESHOT_TEMPERATURE`] / [`SESSION_TEMPERATURE`]); catalog
/// handles keep the temperature they were constructed with.
///
/// # Errors
///
/// Fails with [`ResolveError::InvalidModelSelection`] if either axis does
/// not resolve, or [`ResolveError::MissingCustomCredentials`] if
/// `custom_openai` is selected without endpoint + credential. No partial
/// state is returned.
pub fn resolve(
    chat_catalog: &ChatCatalog,
    embedding_catalog: &EmbeddingCatalog,
    selection: &ModelSelection,
    custom_temperature: f32,
) -> Result<ResolvedModels, ResolveError> {
    let chat = resolve_chat(chat_catalog, selection, custom_temperature)?;
    let embedding = resolve_embedding(embedding_catalog, selection)?;
    Ok(ResolvedModels { chat, embedding })
}

fn resolve_chat(
    catalog: &ChatCatalog,
    selection: &ModelSelection,
    custom_temperature: f32,
) -> Result<ChatHandle, ResolveError> {
    let provider = selection
        .chat_provider
        .clone()
        .or_else(|| catalog.keys().next().cloned())
        .ok_or(ResolveError::InvalidModelSelection)?;

    if provider == CUSTOM_OPENAI {
        let base_url = selection
            .custom_base_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ResolveError::MissingCustomCredentials)?;
        let api_key = selection
            .custom_api_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ResolveError::MissingCustomCredentials)?;
        let model = selection
            .chat_model
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ResolveError::InvalidModelSelection)?;

        let handle: ChatHandle = Arc::new(OpenAiCompatChat::new(
            base_url,
            Some(api_key.to_string()),
            model,
            custom_temperature,
        ));
        return Ok(handle);
    }

    let models = catalog
        .get(&provider)
        .ok_or(ResolveError::InvalidModelSelection)?;
    let model = selection
        .chat_model
        .clone()
        .or_else(|| models.keys().next().cloned())
        .ok_or(ResolveError::InvalidModelSelection)?;

    models
        .get(&model)
        .map(|d| Arc::clone(&d.handle))
        .ok_or(ResolveError::InvalidModelSelection)
}

fn resolve_embedding(
    catalog: &EmbeddingCatalog,
    selection: &ModelSelection,
) -> Result<EmbeddingHandle, ResolveError> {
    let provider = selection
        .embedding_provider
        .clone()
        .or_else(|| catalog.keys().next().cloned())
        .ok_or(ResolveError::InvalidModelSelection)?;

    let models = catalog
        .get(&provider)
        .ok_or(ResolveError::InvalidModelSelection)?;
    let model = selection
        .embedding_model
        .clone()
        .or_else(|| models.keys().next().cloned())
        .ok_or(ResolveError::InvalidModelSelection)?;

    models
        .get(&model)
        .map(|d| Arc::clone(&d.handle))
        .ok_or(ResolveError::InvalidModelSelection)
}
