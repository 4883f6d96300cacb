//! Meridian: conversational search gateway
//!
//! Clients attach over a persistent WebSocket (or a one-shot HTTP
//! request), select a chat model and an embedding model per session, and
//! receive answers as a stream of typed events.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server with WebSocket sessions
//! - **Provider Catalog**: per-request snapshot of usable chat/embedding
//!   models across dynamic providers
//! - **Model Resolver**: turns a requested selection into concrete handles
//! - **Search Orchestrator**: dispatches queries to focus-mode pipelines
//!   and adapts their event streams to the wire protocol
//!
//! # Modules
//!
//! - [`providers`]: provider catalog construction
//! - [`resolver`]: model resolution
//! - [`search`]: orchestration and the reference web pipeline
//! - [`events`]: the streaming wire protocol
//! - [`ws`]: persistent session lifecycle
//! - [`api`]: request/response endpoints

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod api;
pub mod config;
pub mod events;
pub mod models;
pub mod providers;
pub mod resolver;
pub mod search;
pub mod searxng;
pub mod server;
pub mod similarity;
pub mod ws;

use std::sync::Arc;

use config::SharedConfig;
use search::HandlerRegistry;
use search::web::WebSearchHandler;
use searxng::SearxngSearchOptions;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Current configuration snapshot (swappable).
    pub config: SharedConfig,
    /// Focus-mode pipeline registry.
    pub registry: Arc<HandlerRegistry>,
}

impl AppState {
    /// Assemble state from a config snapshot and a pipeline registry.
    #[must_use]
    pub fn new(config: SharedConfig, registry: Arc<HandlerRegistry>) -> Self {
        Self { config, registry }
    }
}

/// Build the default pipeline registry.
///
/// All focus modes share the SearXNG-backed handler, parameterized by
/// where they search.
#[must_use]
pub fn default_registry(config: &SharedConfig) -> HandlerRegistry {
    let engines = |names: &[&str]| SearxngSearchOptions {
        engines: Some(names.iter().map(ToString::to_string).collect()),
        ..SearxngSearchOptions::default()
    };

    HandlerRegistry::new()
        .with_handler(
            "webSearch",
            Arc::new(WebSearchHandler::new(Arc::clone(config))),
        )
        .with_handler(
            "academicSearch",
            Arc::new(WebSearchHandler::with_options(
                Arc::clone(config),
                engines(&["arxiv", "google scholar", "pubmed"]),
            )),
        )
        .with_handler(
            "youtubeSearch",
            Arc::new(WebSearchHandler::with_options(
                Arc::clone(config),
                engines(&["youtube"]),
            )),
        )
        .with_handler(
            "redditSearch",
            Arc::new(WebSearchHandler::with_options(
                Arc::clone(config),
                engines(&["reddit"]),
            )),
        )
}
