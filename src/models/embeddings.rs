//! Embedding model drivers.

use anyhow::Context;
use fastembed::{InitOptions, TextEmbedding};
use tokio::sync::Mutex;
use tracing::info;

use super::EmbeddingModel;

/// Embeddings driver for any OpenAI-compatible `/v1/embeddings` endpoint.
///
/// Backs the `openai` and `ollama` embedding providers.
#[derive(Clone)]
pub struct OpenAiCompatEmbeddings {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl std::fmt::Debug for OpenAiCompatEmbeddings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatEmbeddings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiCompatEmbeddings {
    /// Create a driver bound to an endpoint, credential and model name.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingModel for OpenAiCompatEmbeddings {
    async fn embed(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.api_key {
            rb = rb.bearer_auth(k);
        }

        let resp: serde_json::Value = rb.send().await?.error_for_status()?.json().await?;
        let data = resp["data"]
            .as_array()
            .context("embeddings response missing data array")?;

        data.iter()
            .map(|entry| {
                entry["embedding"]
                    .as_array()
                    .context("embedding entry missing vector")?
                    .iter()
                    .map(|x| {
                        x.as_f64()
                            .map(|f| f as f32)
                            .context("non-numeric embedding component")
                    })
                    .collect()
            })
            .collect()
    }
}

/// In-process embeddings via `fastembed`.
///
/// The underlying model is downloaded and initialized on first use; the
/// handle itself is cheap to construct, so it can be listed in every
/// catalog snapshot without paying the load cost up front.
pub struct LocalEmbeddings {
    kind: fastembed::EmbeddingModel,
    model: Mutex<Option<TextEmbedding>>,
}

impl std::fmt::Debug for LocalEmbeddings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEmbeddings")
            .field("kind", &self.kind)
            .finish()
    }
}

impl LocalEmbeddings {
    /// Create a lazy handle for the given `fastembed` model.
    #[must_use]
    pub fn new(kind: fastembed::EmbeddingModel) -> Self {
        Self {
            kind,
            model: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingModel for LocalEmbeddings {
    async fn embed(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut guard = self.model.lock().await;

        if guard.is_none() {
            info!(model = ?self.kind, "Initializing local embedding model");
            let kind = self.kind.clone();
            let loaded =
                tokio::task::spawn_blocking(move || TextEmbedding::try_new(InitOptions::new(kind)))
                    .await??;
            *guard = Some(loaded);
        }

        // TextEmbedding::embed takes &mut self and blocks; move the model
        // into a blocking task and put it back afterwards.
        let mut owned = guard
            .take()
            .context("embedding model unexpectedly absent")?;
        let (result, returned) = tokio::task::spawn_blocking(move || {
            let res = owned.embed(texts, None);
            (res, owned)
        })
        .await?;
        *guard = Some(returned);

        result.map_err(|e| anyhow::anyhow!(e))
    }
}
