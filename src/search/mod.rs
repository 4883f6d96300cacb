//! Search orchestration.
//!
//! A query is dispatched to a pipeline selected by its focus-mode tag.
//! Pipelines produce a lazy, single-pass sequence of JSON-encoded event
//! payloads; the orchestrator decodes them and adapts the sequence to the
//! caller:
//!
//! - [`collect_reply`] folds the whole sequence into a single reply for
//!   request/response exchanges (concatenate `response` fragments, keep
//!   the last `sources` list, short-circuit on `error`).
//! - [`into_stream_events`] relays each event as a typed [`StreamEvent`]
//!   for persistent connections, appending the terminal `signal: end` on
//!   clean completion.
//!
//! Either way, exactly one terminal event closes each call's sequence.

pub mod web;

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::events::{SourceRecord, StreamEvent, keys};
use crate::models::{ChatHandle, ChatMessage, EmbeddingHandle};

/// Caller-supplied hint passed through to pipelines, not interpreted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationMode {
    /// Favor latency over answer quality.
    Speed,
    /// Default balance.
    #[default]
    Balanced,
}

/// Raw payload sequence produced by a pipeline: one JSON-encoded event
/// per item, single-pass, non-restartable.
pub type PayloadStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// An external answering pipeline, selected by focus-mode tag.
#[async_trait::async_trait]
pub trait SearchHandler: Send + Sync {
    /// Run the pipeline for one query.
    async fn search(
        &self,
        query: String,
        history: Vec<ChatMessage>,
        chat: ChatHandle,
        embedding: EmbeddingHandle,
        mode: OptimizationMode,
    ) -> PayloadStream;
}

/// Open registry of pipelines keyed by focus-mode tag.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn SearchHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("tags", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipeline under a focus-mode tag.
    #[must_use]
    pub fn with_handler(mut self, tag: impl Into<String>, handler: Arc<dyn SearchHandler>) -> Self {
        self.handlers.insert(tag.into(), handler);
        self
    }

    /// Look up the pipeline for a focus mode.
    #[must_use]
    pub fn get(&self, focus_mode: &str) -> Option<Arc<dyn SearchHandler>> {
        self.handlers.get(focus_mode).map(Arc::clone)
    }
}

/// Dispatch failure: the focus mode names no registered pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("invalid focus mode: {0}")]
    InvalidFocusMode(String),
}

/// Dispatch a query to the pipeline registered under `focus_mode`.
///
/// # Errors
///
/// Fails with [`SearchError::InvalidFocusMode`] before any pipeline is
/// invoked if the tag is unknown; no events are emitted in that case.
pub async fn dispatch(
    registry: &HandlerRegistry,
    focus_mode: &str,
    query: String,
    history: Vec<ChatMessage>,
    chat: ChatHandle,
    embedding: EmbeddingHandle,
    mode: OptimizationMode,
) -> Result<PayloadStream, SearchError> {
    let handler = registry
        .get(focus_mode)
        .ok_or_else(|| SearchError::InvalidFocusMode(focus_mode.to_string()))?;
    Ok(handler.search(query, history, chat, embedding, mode).await)
}

/// A decoded pipeline event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Incremental answer fragment.
    Response(String),
    /// Full replacement of the source list.
    Sources(Vec<SourceRecord>),
    /// Pipeline runtime failure; terminal.
    Error(String),
}

/// Decode one raw payload. Unknown event types decode to `None` and are
/// ignored by both adaptations.
///
/// # Errors
///
/// Returns the JSON error for undecodable payloads.
pub fn decode_payload(payload: &str) -> Result<Option<PipelineEvent>, serde_json::Error> {
    let v: serde_json::Value = serde_json::from_str(payload)?;
    match v.get("type").and_then(|t| t.as_str()) {
        Some("response") => {
            let data: String = serde_json::from_value(v["data"].clone())?;
            Ok(Some(PipelineEvent::Response(data)))
        }
        Some("sources") => {
            let data: Vec<SourceRecord> = serde_json::from_value(v["data"].clone())?;
            Ok(Some(PipelineEvent::Sources(data)))
        }
        Some("error") => {
            let data: String = serde_json::from_value(v["data"].clone())?;
            Ok(Some(PipelineEvent::Error(data)))
        }
        _ => Ok(None),
    }
}

/// Encode a `response` payload (used by pipelines).
#[must_use]
pub fn response_payload(text: &str) -> String {
    serde_json::json!({ "type": "response", "data": text }).to_string()
}

/// Encode a `sources` payload (used by pipelines).
#[must_use]
pub fn sources_payload(sources: &[SourceRecord]) -> String {
    serde_json::json!({ "type": "sources", "data": sources }).to_string()
}

/// Encode an `error` payload (used by pipelines).
#[must_use]
pub fn error_payload(text: &str) -> String {
    serde_json::json!({ "type": "error", "data": text }).to_string()
}

/// Adapt a payload sequence into typed [`StreamEvent`]s, relayed verbatim
/// in pipeline order. The sequence always ends with exactly one terminal
/// event: `signal: end` on clean completion, or the first `error`. After
/// an error, the underlying pipeline is not consumed further.
pub fn into_stream_events(payloads: PayloadStream) -> impl Stream<Item = StreamEvent> + Send {
    async_stream::stream! {
        futures::pin_mut!(payloads);

        while let Some(payload) = payloads.next().await {
            match decode_payload(&payload) {
                Ok(None) => {}
                Ok(Some(PipelineEvent::Response(data))) => {
                    yield StreamEvent::Response { data };
                }
                Ok(Some(PipelineEvent::Sources(data))) => {
                    yield StreamEvent::Sources { data };
                }
                Ok(Some(PipelineEvent::Error(data))) => {
                    yield StreamEvent::error(data, keys::CHAIN_ERROR);
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Undecodable pipeline payload");
                    yield StreamEvent::error(
                        "An error has occurred.",
                        keys::INTERNAL_SERVER_ERROR,
                    );
                    return;
                }
            }
        }

        yield StreamEvent::end();
    }
}

/// The buffered result of one successful orchestration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReply {
    /// Accumulated answer text.
    pub message: String,
    /// Last-seen source list.
    pub sources: Vec<SourceRecord>,
}

/// Terminal pipeline failure surfaced by the one-shot adaptation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct PipelineFailure {
    /// Human-readable error text from the pipeline.
    pub message: String,
    /// Symbolic key identifying the cause.
    pub key: String,
}

/// Fold a payload sequence into a single reply: concatenate `response`
/// fragments in order, keep the last `sources` list, short-circuit on the
/// first `error` (fragments seen before the error are discarded).
pub async fn collect_reply(payloads: PayloadStream) -> Result<SearchReply, PipelineFailure> {
    let events = into_stream_events(payloads);
    futures::pin_mut!(events);

    let mut message = String::new();
    let mut sources = Vec::new();

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Response { data } => message.push_str(&data),
            StreamEvent::Sources { data } => sources = data,
            StreamEvent::Error { data, key } => {
                return Err(PipelineFailure { message: data, key });
            }
            StreamEvent::Signal { .. } => {}
        }
    }

    Ok(SearchReply { message, sources })
}
