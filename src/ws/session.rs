//! Session lifecycle: handshake, ready signal, message loop.
//!
//! A session moves through `Connecting -> Ready -> Active* -> Closed`.
//! Model resolution happens once, during `Connecting`; a failure there
//! sends one `error` event and closes without ever reaching `Ready`.
//! The message loop processes inbound frames strictly in order: a new
//! orchestration call starts only after the previous call's terminal
//! event has been sent, so one session never has two calls in flight
//! (later frames queue in the socket). Transport failures are logged and
//! end the loop; they never panic the task.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::config;
use crate::events::{StreamEvent, keys};
use crate::models::history_from_pairs;
use crate::providers::{list_chat_providers, list_embedding_providers};
use crate::resolver::{self, ResolvedModels, SESSION_TEMPERATURE};
use crate::search::{self, OptimizationMode, SearchError};

use super::ConnectParams;

/// An inbound search request frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// The user's query.
    pub query: String,
    /// Focus-mode tag selecting the pipeline.
    pub focus_mode: String,
    /// Hint passed through to the pipeline.
    #[serde(default)]
    pub optimization_mode: OptimizationMode,
    /// Prior turns as `[role, text]` pairs, oldest first.
    #[serde(default)]
    pub history: Vec<(String, String)>,
}

/// Outbound event sink, abstracted over the socket for testability.
#[async_trait::async_trait]
pub(crate) trait EventSink: Send {
    async fn send_event(&mut self, event: &StreamEvent) -> Result<(), axum::Error>;
}

#[async_trait::async_trait]
impl EventSink for WebSocket {
    async fn send_event(&mut self, event: &StreamEvent) -> Result<(), axum::Error> {
        self.send(Message::Text(event.to_frame().into())).await
    }
}

/// Drive one session from accept to close.
pub(crate) async fn run(
    mut socket: WebSocket,
    params: ConnectParams,
    peer: SocketAddr,
    state: AppState,
) {
    info!(peer = %peer, "New WebSocket connection");

    // Connecting -> Ready: resolve models against a fresh catalog snapshot.
    let cfg = config::snapshot(&state.config).await;
    let (chat_catalog, embedding_catalog) = tokio::join!(
        list_chat_providers(&cfg),
        list_embedding_providers(&cfg)
    );

    let selection = params.into_selection();
    let resolved = match resolver::resolve(
        &chat_catalog,
        &embedding_catalog,
        &selection,
        SESSION_TEMPERATURE,
    ) {
        Ok(resolved) => resolved,
        Err(e) => {
            error!(peer = %peer, error = %e, "Session setup failed");
            let event = StreamEvent::error(
                "Invalid LLM or embeddings model selected, please refresh the page and try again.",
                e.wire_key(),
            );
            let _ = socket.send_event(&event).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    // The upgrade is complete, so the channel is writable: confirm
    // readiness with a single signal rather than a polling heartbeat.
    if socket.send_event(&StreamEvent::open()).await.is_err() {
        debug!(peer = %peer, "Client went away before ready signal");
        return;
    }
    debug!(peer = %peer, "Session ready");

    // Ready -> Active, repeatedly. Frames are processed to completion in
    // arrival order.
    while let Some(frame) = socket.recv().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                debug!(peer = %peer, error = %e, "Connection error");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                if handle_message(&mut socket, &state, &resolved, text.as_str(), peer)
                    .await
                    .is_err()
                {
                    debug!(peer = %peer, "Client went away mid-call");
                    break;
                }
            }
            Message::Close(_) => {
                debug!(peer = %peer, "Connection closed by client");
                break;
            }
            // Ping/pong are handled by the transport; binary frames are
            // not part of the protocol.
            _ => {}
        }
    }

    debug!(peer = %peer, "Session closed");
}

/// Run one orchestration call for an inbound frame.
///
/// Returns `Err` only on transport failure (the peer is gone); protocol
/// errors are reported to the client as `error` events and keep the
/// session open.
pub(crate) async fn handle_message<S: EventSink>(
    sink: &mut S,
    state: &AppState,
    resolved: &ResolvedModels,
    text: &str,
    peer: SocketAddr,
) -> Result<(), axum::Error> {
    let inbound: InboundMessage = match serde_json::from_str(text) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!(peer = %peer, error = %e, "Malformed inbound frame");
            return sink
                .send_event(&StreamEvent::error("Invalid message format", keys::INVALID_FORMAT))
                .await;
        }
    };

    let request_id = Uuid::new_v4().to_string();
    debug!(
        peer = %peer,
        request_id = %request_id,
        focus_mode = %inbound.focus_mode,
        "Received search message"
    );

    let history = history_from_pairs(&inbound.history);
    let payloads = match search::dispatch(
        &state.registry,
        &inbound.focus_mode,
        inbound.query,
        history,
        Arc::clone(&resolved.chat),
        Arc::clone(&resolved.embedding),
        inbound.optimization_mode,
    )
    .await
    {
        Ok(payloads) => payloads,
        Err(SearchError::InvalidFocusMode(tag)) => {
            warn!(peer = %peer, focus_mode = %tag, "Unknown focus mode");
            return sink
                .send_event(&StreamEvent::error("Invalid focus mode", keys::INVALID_FOCUS_MODE))
                .await;
        }
    };

    // Relay every event in pipeline order; the adapter guarantees exactly
    // one terminal event.
    let events = search::into_stream_events(payloads);
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        sink.send_event(&event).await?;
    }

    debug!(peer = %peer, request_id = %request_id, "Search call completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ProvidersConfig, SearchConfig, ServerConfig};
    use crate::models::{ChatHandle, ChatMessage, ChatModel, EmbeddingHandle, EmbeddingModel, TextStream};
    use crate::search::{HandlerRegistry, PayloadStream, SearchHandler, response_payload};

    fn peer() -> SocketAddr {
        "127.0.0.1:9999".parse().unwrap()
    }

    fn test_state(registry: HandlerRegistry) -> AppState {
        let config = AppConfig {
            server: ServerConfig {
                port: 3001,
                host: "127.0.0.1".to_string(),
            },
            providers: ProvidersConfig::default(),
            search: SearchConfig {
                searxng_api_url: "http://127.0.0.1:1".to_string(),
                similarity_measure: "cosine".to_string(),
            },
        }
        .into_shared();
        AppState::new(config, Arc::new(registry))
    }

    struct StubChat;

    #[async_trait::async_trait]
    impl ChatModel for StubChat {
        async fn stream_chat(&self, _messages: Vec<ChatMessage>) -> anyhow::Result<TextStream> {
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    struct StubEmbedding;

    #[async_trait::async_trait]
    impl EmbeddingModel for StubEmbedding {
        async fn embed(&self, _texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(Vec::new())
        }
    }

    fn stub_resolved() -> ResolvedModels {
        let chat: ChatHandle = Arc::new(StubChat);
        let embedding: EmbeddingHandle = Arc::new(StubEmbedding);
        ResolvedModels { chat, embedding }
    }

    /// Pipeline that echoes its query in labeled fragments.
    struct EchoHandler;

    #[async_trait::async_trait]
    impl SearchHandler for EchoHandler {
        async fn search(
            &self,
            query: String,
            _history: Vec<ChatMessage>,
            _chat: ChatHandle,
            _embedding: EmbeddingHandle,
            _mode: OptimizationMode,
        ) -> PayloadStream {
            Box::pin(futures::stream::iter(vec![
                response_payload(&format!("{query}-1")),
                response_payload(&format!("{query}-2")),
            ]))
        }
    }

    /// Sink that records events and optionally fails after a count.
    struct VecSink {
        sent: Vec<StreamEvent>,
        fail_after: Option<usize>,
    }

    impl VecSink {
        fn new() -> Self {
            Self {
                sent: Vec::new(),
                fail_after: None,
            }
        }

        fn failing_after(n: usize) -> Self {
            Self {
                sent: Vec::new(),
                fail_after: Some(n),
            }
        }
    }

    #[async_trait::async_trait]
    impl EventSink for VecSink {
        async fn send_event(&mut self, event: &StreamEvent) -> Result<(), axum::Error> {
            if let Some(limit) = self.fail_after {
                if self.sent.len() >= limit {
                    return Err(axum::Error::new(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "connection closed",
                    )));
                }
            }
            self.sent.push(event.clone());
            Ok(())
        }
    }

    fn frame(query: &str) -> String {
        serde_json::json!({ "query": query, "focusMode": "webSearch" }).to_string()
    }

    #[tokio::test]
    async fn test_sequential_messages_do_not_interleave() {
        let state = test_state(HandlerRegistry::new().with_handler("webSearch", Arc::new(EchoHandler)));
        let resolved = stub_resolved();
        let mut sink = VecSink::new();

        handle_message(&mut sink, &state, &resolved, &frame("a"), peer())
            .await
            .unwrap();
        handle_message(&mut sink, &state, &resolved, &frame("b"), peer())
            .await
            .unwrap();

        let expected = vec![
            StreamEvent::Response { data: "a-1".to_string() },
            StreamEvent::Response { data: "a-2".to_string() },
            StreamEvent::end(),
            StreamEvent::Response { data: "b-1".to_string() },
            StreamEvent::Response { data: "b-2".to_string() },
            StreamEvent::end(),
        ];
        assert_eq!(sink.sent, expected);
    }

    #[tokio::test]
    async fn test_closed_sink_mid_call_is_not_a_fault() {
        let state = test_state(HandlerRegistry::new().with_handler("webSearch", Arc::new(EchoHandler)));
        let resolved = stub_resolved();
        let mut sink = VecSink::failing_after(1);

        let result = handle_message(&mut sink, &state, &resolved, &frame("a"), peer()).await;

        assert!(result.is_err());
        assert_eq!(sink.sent.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_frame_sends_nonfatal_error() {
        let state = test_state(HandlerRegistry::new().with_handler("webSearch", Arc::new(EchoHandler)));
        let resolved = stub_resolved();
        let mut sink = VecSink::new();

        handle_message(&mut sink, &state, &resolved, "{not json", peer())
            .await
            .unwrap();

        assert_eq!(sink.sent.len(), 1);
        assert_eq!(
            sink.sent[0],
            StreamEvent::error("Invalid message format", keys::INVALID_FORMAT)
        );
    }

    #[tokio::test]
    async fn test_unknown_focus_mode_sends_error_event() {
        let state = test_state(HandlerRegistry::new());
        let resolved = stub_resolved();
        let mut sink = VecSink::new();

        handle_message(&mut sink, &state, &resolved, &frame("a"), peer())
            .await
            .unwrap();

        assert_eq!(
            sink.sent,
            vec![StreamEvent::error("Invalid focus mode", keys::INVALID_FOCUS_MODE)]
        );
    }

    #[test]
    fn test_inbound_message_defaults() {
        let inbound: InboundMessage =
            serde_json::from_str(r#"{"query":"q","focusMode":"webSearch"}"#).unwrap();
        assert_eq!(inbound.optimization_mode, OptimizationMode::Balanced);
        assert!(inbound.history.is_empty());
    }
}
