//! Anthropic Messages API streaming driver.
//!
//! Connects to `{base_url}/v1/messages` with `stream: true` and yields
//! text deltas from `content_block_delta` events. System messages are
//! lifted into the request's `system` field; the Messages API does not
//! accept them inline.

use futures::StreamExt;

use super::{ChatMessage, ChatModel, ChatRole, TextStream};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Streaming chat driver for the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicChat {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl std::fmt::Debug for AnthropicChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicChat")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl AnthropicChat {
    /// Create a driver for the given credential and model name.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.anthropic.com".to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        }
    }

    /// The model name this handle invokes.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl ChatModel for AnthropicChat {
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<TextStream> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));

        // System turns go into the dedicated `system` field.
        let system: String = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let turns: Vec<&ChatMessage> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "stream": true,
            "temperature": self.temperature,
            "max_tokens": DEFAULT_MAX_TOKENS,
            "messages": turns,
        });
        if !system.is_empty() {
            body["system"] = serde_json::Value::String(system);
        }

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let byte_stream = resp.bytes_stream();

        let out = async_stream::try_stream! {
            let mut buf = Vec::<u8>::new();

            futures::pin_mut!(byte_stream);
            'read: while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk?;
                buf.extend_from_slice(&chunk);

                while let Some(pos) = find_double_newline(&buf) {
                    let frame = buf.drain(..pos + 2).collect::<Vec<_>>();
                    let text = String::from_utf8_lossy(&frame);

                    for line in text.lines() {
                        let line = line.trim();
                        if !line.starts_with("data:") {
                            continue;
                        }
                        let data = line.trim_start_matches("data:").trim();

                        let v: serde_json::Value = serde_json::from_str(data)?;
                        match v.get("type").and_then(|t| t.as_str()) {
                            Some("content_block_delta") => {
                                if let Some(s) = v["delta"].get("text").and_then(|x| x.as_str()) {
                                    if !s.is_empty() {
                                        yield s.to_string();
                                    }
                                }
                            }
                            Some("message_stop") => break 'read,
                            Some("error") => {
                                let message = v["error"]["message"]
                                    .as_str()
                                    .unwrap_or("upstream error")
                                    .to_string();
                                let failed: Result<(), anyhow::Error> =
                                    Err(anyhow::anyhow!(message));
                                failed?;
                            }
                            _ => {}
                        }
                    }
                }
            }
        };

        Ok(Box::pin(out))
    }
}

/// Find the position of a double newline in the buffer.
fn find_double_newline(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_construction() {
        let driver = AnthropicChat::new("sk-ant-test", "claude-3-5-sonnet-20241022", 0.7);
        assert_eq!(driver.model(), "claude-3-5-sonnet-20241022");
    }
}
