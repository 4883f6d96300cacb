//! OpenAI-compatible Chat Completions streaming driver.
//!
//! Connects to `{base_url}/v1/chat/completions` with `stream: true` and
//! yields assistant text deltas. This single driver backs the `openai`,
//! `groq` and `ollama` providers as well as caller-supplied custom
//! endpoints; only the base URL, credential and model name differ.

use futures::StreamExt;

use super::{ChatMessage, ChatModel, TextStream};

/// Streaming chat driver for any OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiCompatChat {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl std::fmt::Debug for OpenAiCompatChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatChat")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAiCompatChat {
    /// Create a driver bound to an endpoint, credential and model name.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
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
impl ChatModel for OpenAiCompatChat {
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<TextStream> {
        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model": self.model,
            "stream": true,
            "temperature": self.temperature,
            "messages": messages,
        });

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.api_key {
            rb = rb.bearer_auth(k);
        }

        let resp = rb.send().await?.error_for_status()?;
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

                        if data == "[DONE]" {
                            break 'read;
                        }

                        let v: serde_json::Value = serde_json::from_str(data)?;
                        if let Some(s) = v["choices"][0]["delta"]
                            .get("content")
                            .and_then(|x| x.as_str())
                        {
                            if !s.is_empty() {
                                yield s.to_string();
                            }
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
