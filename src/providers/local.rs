//! Local embedding provider loader (`fastembed`).
//!
//! Always listed: handles are lazy, the underlying model is only
//! downloaded and loaded on first use.

use std::sync::Arc;

use crate::models::{EmbeddingHandle, LocalEmbeddings};

use super::ModelMap;

const EMBEDDING_MODELS: &[(fastembed::EmbeddingModel, &str, &str)] = &[
    (
        fastembed::EmbeddingModel::BGESmallENV15,
        "bge-small-en-v1.5",
        "BGE Small EN v1.5",
    ),
    (
        fastembed::EmbeddingModel::AllMiniLML6V2,
        "all-minilm-l6-v2",
        "All MiniLM L6 v2",
    ),
];

pub async fn embedding_models() -> ModelMap<EmbeddingHandle> {
    EMBEDDING_MODELS
        .iter()
        .map(|(kind, name, display)| {
            let handle: EmbeddingHandle = Arc::new(LocalEmbeddings::new(kind.clone()));
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
