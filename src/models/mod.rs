//! Model handle traits and streaming drivers.
//!
//! A resolved session holds exactly two capabilities: a [`ChatModel`] that
//! streams answer text and an [`EmbeddingModel`] that embeds text batches.
//! Everything downstream of the resolver depends only on these traits,
//! never on provider identity.
//!
//! # Drivers
//!
//! - [`OpenAiCompatChat`]: OpenAI-compatible Chat Completions streaming
//!   (`/v1/chat/completions`), used by the `openai`, `groq`, `ollama` and
//!   `custom_openai` providers.
//! - [`AnthropicChat`]: Anthropic Messages API streaming (`/v1/messages`).
//! - [`OpenAiCompatEmbeddings`]: OpenAI-compatible embeddings endpoint.
//! - [`LocalEmbeddings`]: in-process `fastembed` models, initialized lazily.

pub mod anthropic;
pub mod embeddings;
pub mod openai_compat;

pub use anthropic::AnthropicChat;
pub use embeddings::{LocalEmbeddings, OpenAiCompatEmbeddings};
pub use openai_compat::OpenAiCompatChat;

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use serde::{Deserialize, Serialize};

/// A stream of answer text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = anyhow::Result<String>> + Send>>;

/// Shared, ready-to-invoke chat model handle.
pub type ChatHandle = Arc<dyn ChatModel>;

/// Shared, ready-to-invoke embedding model handle.
pub type EmbeddingHandle = Arc<dyn EmbeddingModel>;

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System prompt.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author.
    pub role: ChatRole,
    /// Text content.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Trait for streaming chat models.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Stream an answer for the given conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be started; mid-stream
    /// failures surface as `Err` items on the returned stream.
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<TextStream>;
}

/// Trait for embedding models.
#[async_trait::async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a batch of texts, preserving order.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch cannot be embedded.
    async fn embed(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Convert `[role, text]` history pairs into chat messages.
///
/// `"human"` maps to [`ChatRole::User`], `"assistant"` to
/// [`ChatRole::Assistant`]; entries with any other role are dropped, not
/// errors. Order is preserved.
#[must_use]
pub fn history_from_pairs(pairs: &[(String, String)]) -> Vec<ChatMessage> {
    pairs
        .iter()
        .filter_map(|(role, text)| match role.as_str() {
            "human" => Some(ChatMessage::user(text.clone())),
            "assistant" => Some(ChatMessage::assistant(text.clone())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(role: &str, text: &str) -> (String, String) {
        (role.to_string(), text.to_string())
    }

    #[test]
    fn test_history_drops_unrecognized_roles() {
        let history = history_from_pairs(&[
            pair("human", "hi"),
            pair("assistant", "hello"),
            pair("system", "x"),
        ]);

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[0].content, "hi");
        assert_eq!(history[1].role, ChatRole::Assistant);
        assert_eq!(history[1].content, "hello");
    }

    #[test]
    fn test_history_preserves_order() {
        let history = history_from_pairs(&[
            pair("assistant", "a"),
            pair("human", "b"),
            pair("assistant", "c"),
        ]);
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_message_role_wire_names() {
        let msg = ChatMessage::user("q");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));

        let sys = ChatMessage::system("s");
        let json = serde_json::to_string(&sys).unwrap();
        assert!(json.contains("\"role\":\"system\""));
    }
}
