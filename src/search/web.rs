//! Web search pipeline.
//!
//! Queries SearXNG, emits the result list as sources (reranked by
//! embedding similarity in balanced mode), then streams an answer from
//! the chat handle grounded in those sources. Retrieval failures degrade
//! to an answer without sources; chat failures terminate the call with an
//! error event.

use futures::StreamExt;
use tracing::{debug, warn};

use crate::config::{self, SharedConfig};
use crate::events::SourceRecord;
use crate::models::{ChatHandle, ChatMessage, EmbeddingHandle};
use crate::searxng::{SearxngClient, SearxngSearchOptions};
use crate::similarity::SimilarityMeasure;

use super::{
    OptimizationMode, PayloadStream, SearchHandler, error_payload, response_payload,
    sources_payload,
};

/// Cap on sources handed to the model.
const MAX_SOURCES: usize = 15;

/// SearXNG-backed web search pipeline.
///
/// Focus modes that differ only in where they search (academic engines,
/// a single site) share this handler with different search options.
#[derive(Debug)]
pub struct WebSearchHandler {
    config: SharedConfig,
    options: SearxngSearchOptions,
}

impl WebSearchHandler {
    /// Create a handler reading the current config snapshot per call.
    #[must_use]
    pub fn new(config: SharedConfig) -> Self {
        Self::with_options(config, SearxngSearchOptions::default())
    }

    /// Create a handler with fixed search options.
    #[must_use]
    pub fn with_options(config: SharedConfig, options: SearxngSearchOptions) -> Self {
        Self { config, options }
    }
}

#[async_trait::async_trait]
impl SearchHandler for WebSearchHandler {
    async fn search(
        &self,
        query: String,
        history: Vec<ChatMessage>,
        chat: ChatHandle,
        embedding: EmbeddingHandle,
        mode: OptimizationMode,
    ) -> PayloadStream {
        let cfg = config::snapshot(&self.config).await;
        let searxng = SearxngClient::new(cfg.search.searxng_api_url.clone());
        let measure = SimilarityMeasure::parse(&cfg.search.similarity_measure);
        let options = self.options.clone();

        Box::pin(async_stream::stream! {
            let resp = searxng.search(&query, Some(&options)).await;
            let mut sources: Vec<SourceRecord> = resp
                .results
                .into_iter()
                .take(MAX_SOURCES)
                .map(|r| SourceRecord {
                    title: r.title,
                    url: r.url,
                    snippet: r.content,
                })
                .collect();

            if mode == OptimizationMode::Balanced && !sources.is_empty() {
                match rerank(&embedding, measure, &query, &sources).await {
                    Ok(order) => {
                        let reordered: Vec<SourceRecord> =
                            order.into_iter().map(|i| sources[i].clone()).collect();
                        sources = reordered;
                    }
                    Err(e) => {
                        warn!(error = %e, "Source reranking failed, keeping retrieval order");
                    }
                }
            }

            debug!(count = sources.len(), "Web search sources gathered");
            yield sources_payload(&sources);

            let mut messages = vec![ChatMessage::system(answer_prompt(&sources))];
            messages.extend(history);
            messages.push(ChatMessage::user(query));

            match chat.stream_chat(messages).await {
                Ok(text_stream) => {
                    futures::pin_mut!(text_stream);
                    while let Some(item) = text_stream.next().await {
                        match item {
                            Ok(text) => yield response_payload(&text),
                            Err(e) => {
                                yield error_payload(&e.to_string());
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    yield error_payload(&e.to_string());
                }
            }
        })
    }
}

/// Order source indices by similarity between the query and each snippet.
async fn rerank(
    embedding: &EmbeddingHandle,
    measure: SimilarityMeasure,
    query: &str,
    sources: &[SourceRecord],
) -> anyhow::Result<Vec<usize>> {
    let mut texts = Vec::with_capacity(sources.len() + 1);
    texts.push(query.to_string());
    for s in sources {
        texts.push(s.snippet.clone().unwrap_or_else(|| s.title.clone()));
    }

    let vectors = embedding.embed(texts).await?;
    let (query_vec, doc_vecs) = vectors
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("empty embedding batch"))?;

    let mut scored: Vec<(usize, f32)> = doc_vecs
        .iter()
        .enumerate()
        .map(|(i, v)| (i, measure.compute(query_vec, v)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(scored.into_iter().map(|(i, _)| i).collect())
}

fn answer_prompt(sources: &[SourceRecord]) -> String {
    let mut prompt = String::from(
        "You are a search assistant. Answer the user's question using the \
         numbered context below. Cite sources as [n] where relevant; if the \
         context is empty or insufficient, say so.\n\n<context>\n",
    );
    for (i, s) in sources.iter().enumerate() {
        let snippet = s.snippet.as_deref().unwrap_or("");
        prompt.push_str(&format!("{}. {} ({})\n{}\n", i + 1, s.title, s.url, snippet));
    }
    prompt.push_str("</context>");
    prompt
}
