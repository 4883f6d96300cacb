//! Typed streaming events for search responses.
//!
//! This module defines the wire contract shared by the one-shot search
//! endpoint and the persistent WebSocket sessions. Every event sent to a
//! client is one of the [`StreamEvent`] variants, serialized as a JSON
//! object shaped `{type, data, key?}`; `key` is present only on `error`
//! and carries a machine-readable cause.
//!
//! # Example
//!
//! ```rust
//! use meridian::events::StreamEvent;
//!
//! let event = StreamEvent::Response { data: "Hello".to_string() };
//! assert!(event.to_frame().contains("\"type\":\"response\""));
//! ```

use serde::{Deserialize, Serialize};

/// Symbolic error keys used on `error` events and one-shot error bodies.
pub mod keys {
    /// The requested chat/embedding selection did not resolve to a handle.
    pub const INVALID_MODEL_SELECTED: &str = "INVALID_MODEL_SELECTED";
    /// `custom_openai` was selected without both endpoint and credential.
    pub const MISSING_CUSTOM_CREDENTIALS: &str = "MISSING_CUSTOM_CREDENTIALS";
    /// No pipeline is registered under the requested focus mode.
    pub const INVALID_FOCUS_MODE: &str = "INVALID_FOCUS_MODE";
    /// An inbound frame could not be parsed.
    pub const INVALID_FORMAT: &str = "INVALID_FORMAT";
    /// The pipeline reported a runtime failure mid-stream.
    pub const CHAIN_ERROR: &str = "CHAIN_ERROR";
    /// Catch-all for unclassified server-side failures.
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
}

/// A single source backing an answer.
///
/// Sources arrive from pipelines as an ordered list; each `sources` event
/// replaces the previously held list in full.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRecord {
    /// Title of the source document or page.
    pub title: String,
    /// URL of the source.
    pub url: String,
    /// Optional snippet from the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Streaming events relayed to clients.
///
/// One orchestration call produces a sequence of these, closed by exactly
/// one terminal event: a `signal` carrying `"end"`, or an `error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Incremental text fragment of the answer.
    Response {
        /// The fragment to append.
        data: String,
    },
    /// Full replacement of the current source list.
    Sources {
        /// Ordered source records.
        data: Vec<SourceRecord>,
    },
    /// Control signal (`"open"` once a session is ready, `"end"` on
    /// successful completion of a call).
    Signal {
        /// The control token.
        data: String,
    },
    /// Terminal failure for the current call (or session setup).
    Error {
        /// Human-readable error text.
        data: String,
        /// Machine-readable cause, one of [`keys`].
        key: String,
    },
}

impl StreamEvent {
    /// The `signal: open` event sent once a session is ready.
    #[must_use]
    pub fn open() -> Self {
        Self::Signal {
            data: "open".to_string(),
        }
    }

    /// The `signal: end` event terminating a successful call.
    #[must_use]
    pub fn end() -> Self {
        Self::Signal {
            data: "end".to_string(),
        }
    }

    /// Build an `error` event from text and a symbolic key.
    #[must_use]
    pub fn error(data: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Error {
            data: data.into(),
            key: key.into(),
        }
    }

    /// Whether this event terminates its call's sequence.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Signal { data } => data == "end",
            Self::Error { .. } => true,
            Self::Response { .. } | Self::Sources { .. } => false,
        }
    }

    /// Serialize to a JSON text frame.
    ///
    /// Serialization of these variants cannot fail in practice; a fallback
    /// error frame is produced if it ever does.
    #[must_use]
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({
                "type": "error",
                "data": e.to_string(),
                "key": keys::INTERNAL_SERVER_ERROR,
            })
            .to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_wire_shape() {
        let event = StreamEvent::Response {
            data: "Hello".to_string(),
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_frame()).unwrap();
        assert_eq!(json["type"], "response");
        assert_eq!(json["data"], "Hello");
        assert!(json.get("key").is_none());
    }

    #[test]
    fn test_sources_wire_shape() {
        let event = StreamEvent::Sources {
            data: vec![SourceRecord {
                title: "Example".to_string(),
                url: "https://example.com".to_string(),
                snippet: None,
            }],
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_frame()).unwrap();
        assert_eq!(json["type"], "sources");
        assert_eq!(json["data"][0]["url"], "https://example.com");
        assert!(json["data"][0].get("snippet").is_none());
    }

    #[test]
    fn test_error_carries_key() {
        let event = StreamEvent::error("boom", keys::CHAIN_ERROR);
        let json: serde_json::Value = serde_json::from_str(&event.to_frame()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["data"], "boom");
        assert_eq!(json["key"], "CHAIN_ERROR");
    }

    #[test]
    fn test_terminal_classification() {
        assert!(StreamEvent::end().is_terminal());
        assert!(StreamEvent::error("x", keys::CHAIN_ERROR).is_terminal());
        assert!(!StreamEvent::open().is_terminal());
        assert!(
            !StreamEvent::Response {
                data: String::new()
            }
            .is_terminal()
        );
    }

    #[test]
    fn test_round_trip() {
        let event = StreamEvent::Sources {
            data: vec![SourceRecord {
                title: "T".to_string(),
                url: "u".to_string(),
                snippet: Some("s".to_string()),
            }],
        };
        let parsed: StreamEvent = serde_json::from_str(&event.to_frame()).unwrap();
        assert_eq!(parsed, event);
    }
}
