//! Router-level integration tests for the request/response endpoints.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};

use meridian::AppState;
use meridian::config::{AppConfig, ProvidersConfig, SearchConfig, ServerConfig};
use meridian::models::{ChatHandle, ChatMessage, EmbeddingHandle};
use meridian::search::{
    HandlerRegistry, OptimizationMode, PayloadStream, SearchHandler, error_payload,
    response_payload, sources_payload,
};
use meridian::server::build_router;

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        providers: ProvidersConfig::default(),
        search: SearchConfig {
            searxng_api_url: "http://127.0.0.1:1".to_string(),
            similarity_measure: "cosine".to_string(),
        },
    }
}

fn server_with_registry(registry: HandlerRegistry) -> TestServer {
    let state = AppState::new(test_config().into_shared(), Arc::new(registry));
    TestServer::new(build_router(state)).expect("failed to start test server")
}

/// Pipeline that emits a canned payload sequence, ignoring its inputs.
struct ScriptedHandler {
    payloads: Vec<String>,
}

#[async_trait::async_trait]
impl SearchHandler for ScriptedHandler {
    async fn search(
        &self,
        _query: String,
        _history: Vec<ChatMessage>,
        _chat: ChatHandle,
        _embedding: EmbeddingHandle,
        _mode: OptimizationMode,
    ) -> PayloadStream {
        Box::pin(futures::stream::iter(self.payloads.clone()))
    }
}

/// A selection that resolves without any provider configured: a custom
/// chat endpoint plus the always-present local embedding provider.
fn custom_chat_selection() -> Value {
    json!({
        "provider": "custom_openai",
        "model": "my-model",
        "customOpenAIBaseURL": "http://localhost:8000",
        "customOpenAIKey": "sk-custom"
    })
}

#[tokio::test]
async fn test_api_status() {
    let server = server_with_registry(HandlerRegistry::new());

    let res = server.get("/api").await;
    res.assert_status(StatusCode::OK);
    assert_eq!(res.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn test_missing_focus_mode_or_query_is_rejected() {
    let server = server_with_registry(HandlerRegistry::new());

    let res = server.post("/api/search").json(&json!({})).await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["message"], "Missing focus mode or query");

    let res = server
        .post("/api/search")
        .json(&json!({ "query": "hello" }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);

    let res = server
        .post("/api/search")
        .json(&json!({ "focusMode": "webSearch" }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_model_selection_is_rejected() {
    let server = server_with_registry(HandlerRegistry::new());

    let res = server
        .post("/api/search")
        .json(&json!({
            "focusMode": "webSearch",
            "query": "hello",
            "chatModel": { "provider": "openai", "model": "gpt-4o" }
        }))
        .await;

    res.assert_status(StatusCode::BAD_REQUEST);
    let body = res.json::<Value>();
    assert_eq!(body["message"], "Invalid model selected");
    assert_eq!(body["key"], "INVALID_MODEL_SELECTED");
}

#[tokio::test]
async fn test_custom_endpoint_without_credentials_is_rejected() {
    let server = server_with_registry(HandlerRegistry::new());

    let res = server
        .post("/api/search")
        .json(&json!({
            "focusMode": "webSearch",
            "query": "hello",
            "chatModel": {
                "provider": "custom_openai",
                "model": "my-model",
                "customOpenAIBaseURL": "http://localhost:8000"
            }
        }))
        .await;

    res.assert_status(StatusCode::BAD_REQUEST);
    let body = res.json::<Value>();
    assert_eq!(body["message"], "Missing custom OpenAI base URL or key");
    assert_eq!(body["key"], "MISSING_CUSTOM_CREDENTIALS");
}

#[tokio::test]
async fn test_unknown_focus_mode_is_rejected_after_resolution() {
    let server = server_with_registry(HandlerRegistry::new());

    let res = server
        .post("/api/search")
        .json(&json!({
            "focusMode": "bogusMode",
            "query": "hello",
            "chatModel": custom_chat_selection()
        }))
        .await;

    res.assert_status(StatusCode::BAD_REQUEST);
    let body = res.json::<Value>();
    assert_eq!(body["message"], "Invalid focus mode");
    assert_eq!(body["key"], "INVALID_FOCUS_MODE");
}

#[tokio::test]
async fn test_one_shot_reply_folds_the_event_sequence() {
    let sources = vec![meridian::events::SourceRecord {
        title: "s1".to_string(),
        url: "https://example.com/s1".to_string(),
        snippet: None,
    }];
    let registry = HandlerRegistry::new().with_handler(
        "webSearch",
        Arc::new(ScriptedHandler {
            payloads: vec![
                response_payload("A"),
                response_payload("B"),
                sources_payload(&sources),
                response_payload("C"),
            ],
        }),
    );
    let server = server_with_registry(registry);

    let res = server
        .post("/api/search")
        .json(&json!({
            "focusMode": "webSearch",
            "query": "hello",
            "chatModel": custom_chat_selection()
        }))
        .await;

    res.assert_status(StatusCode::OK);
    let body = res.json::<Value>();
    assert_eq!(body["message"], "ABC");
    assert_eq!(body["sources"][0]["url"], "https://example.com/s1");
}

#[tokio::test]
async fn test_pipeline_error_yields_500_without_fragments() {
    let registry = HandlerRegistry::new().with_handler(
        "webSearch",
        Arc::new(ScriptedHandler {
            payloads: vec![response_payload("A"), error_payload("boom")],
        }),
    );
    let server = server_with_registry(registry);

    let res = server
        .post("/api/search")
        .json(&json!({
            "focusMode": "webSearch",
            "query": "hello",
            "chatModel": custom_chat_selection()
        }))
        .await;

    res.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.json::<Value>();
    assert_eq!(body["message"], "boom");
    assert_eq!(body["key"], "CHAIN_ERROR");
}

#[tokio::test]
async fn test_history_roles_are_filtered_not_rejected() {
    let registry = HandlerRegistry::new().with_handler(
        "webSearch",
        Arc::new(ScriptedHandler {
            payloads: vec![response_payload("ok")],
        }),
    );
    let server = server_with_registry(registry);

    let res = server
        .post("/api/search")
        .json(&json!({
            "focusMode": "webSearch",
            "query": "hello",
            "chatModel": custom_chat_selection(),
            "history": [["human", "hi"], ["assistant", "hello"], ["system", "x"]]
        }))
        .await;

    res.assert_status(StatusCode::OK);
    assert_eq!(res.json::<Value>()["message"], "ok");
}

#[tokio::test]
async fn test_models_listing_strips_handles() {
    let server = server_with_registry(HandlerRegistry::new());

    let res = server.get("/api/models").await;
    res.assert_status(StatusCode::OK);

    let body = res.json::<Value>();
    // custom_openai is always selectable, with an empty model set.
    assert!(body["chatModelProviders"]["custom_openai"]
        .as_object()
        .expect("custom_openai missing")
        .is_empty());
    // Local embeddings are always listed, names only.
    let local = body["embeddingModelProviders"]["local"]
        .as_object()
        .expect("local provider missing");
    assert!(local.contains_key("bge-small-en-v1.5"));
    assert_eq!(
        local["bge-small-en-v1.5"]["displayName"],
        "BGE Small EN v1.5"
    );
    assert!(local["bge-small-en-v1.5"].get("handle").is_none());
}

#[tokio::test]
async fn test_config_update_installs_a_new_snapshot() {
    let server = server_with_registry(HandlerRegistry::new());

    let before = server.get("/api/config").await.json::<Value>();
    assert!(before["openaiApiKey"].is_null());
    assert!(before["chatModelProviders"].get("openai").is_none());

    let res = server
        .post("/api/config")
        .json(&json!({ "openaiApiKey": "sk-test" }))
        .await;
    res.assert_status(StatusCode::OK);
    assert_eq!(res.json::<Value>()["message"], "Config updated");

    // The new snapshot is visible to subsequent catalog builds.
    let after = server.get("/api/config").await.json::<Value>();
    assert_eq!(after["openaiApiKey"], "sk-test");
    let models = server.get("/api/models").await.json::<Value>();
    assert!(models["chatModelProviders"]["openai"]
        .as_object()
        .expect("openai provider missing after update")
        .contains_key("gpt-4o-mini"));
}
