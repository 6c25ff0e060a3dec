//! OpenAI-compatible provider implementation for Converse
//!
//! This module implements the Provider trait against an OpenAI-style
//! `/chat/completions` endpoint with Server-Sent Events streaming. The
//! HTTP response body is consumed as a byte stream, split into SSE events
//! on blank-line boundaries, and each `data:` payload is decoded into a
//! [`ResponseDelta`] forwarded over an unbounded channel.

use crate::error::{ConverseError, Result};
use crate::providers::{DeltaStream, Message, Provider, ResponseDelta};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Default API base for the public OpenAI endpoint
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Request timeout covering connect plus the full streamed body
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenAI-compatible completion provider
///
/// Connects to any endpoint speaking the chat-completions wire protocol.
/// The API base and an optional proxy come from configuration; the key is
/// sent as a bearer token on every request.
pub struct OpenAiProvider {
    client: Client,
    api_base: String,
    api_key: String,
}

/// Request body for the chat completions endpoint
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

/// One streamed SSE chunk from the completions endpoint
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

/// A single choice inside a streamed chunk
#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: ResponseDelta,
}

impl OpenAiProvider {
    /// Create a new provider instance
    ///
    /// # Arguments
    ///
    /// * `api_key` - Bearer token for the completion endpoint
    /// * `api_base` - Optional endpoint base URL override
    /// * `proxy` - Optional proxy URL applied to all requests
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails or the proxy URL
    /// is invalid.
    pub fn new(api_key: String, api_base: Option<String>, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("converse/0.1.0");

        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                ConverseError::Config(format!("Invalid proxy URL {proxy_url}: {e}"))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ConverseError::Config(format!("Failed to create HTTP client: {e}")))?;

        let api_base = api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        tracing::info!("Initialized completion provider: api_base={}", api_base);

        Ok(Self {
            client,
            api_base,
            api_key,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn stream_complete(&self, model: &str, messages: &[Message]) -> Result<DeltaStream> {
        let request = ChatRequest {
            model,
            messages,
            stream: true,
        };

        let url = self.completions_url();
        tracing::debug!("Opening streaming completion: url={}, model={}", url, model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ConverseError::Authentication(
                "API key rejected by the completion provider".to_string(),
            )
            .into());
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ConverseError::RateLimited(
                "rate limit or maximum monthly limit exceeded".to_string(),
            )
            .into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Unclassified provider failure: surface it, do not swallow.
            anyhow::bail!("completion endpoint returned HTTP {status}: {body}");
        }

        let byte_stream = response.bytes_stream();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            parse_sse_stream(byte_stream, tx).await;
        });

        Ok(DeltaStream::new(rx))
    }
}

/// Map reqwest transport failures onto the turn-recoverable taxonomy.
fn classify_transport_error(e: reqwest::Error) -> anyhow::Error {
    if e.is_timeout() {
        ConverseError::Timeout(e.to_string()).into()
    } else if e.is_connect() {
        ConverseError::Connection(e.to_string()).into()
    } else {
        ConverseError::Http(e).into()
    }
}

/// Parse an SSE byte stream and forward decoded deltas to `tx`.
///
/// Runs inside a `tokio::spawn` and consumes the stream until it ends,
/// `data: [DONE]` arrives, or a transport error occurs. SSE events are
/// separated by blank lines; a single event may carry multiple `data:`
/// lines which are joined with newlines before decoding.
async fn parse_sse_stream(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>>,
    tx: mpsc::UnboundedSender<Result<ResponseDelta>>,
) {
    use futures::StreamExt;

    let mut buffer = String::new();

    tokio::pin!(byte_stream);

    while let Some(chunk_result) = byte_stream.next().await {
        let chunk = match chunk_result {
            Ok(c) => c,
            Err(e) => {
                let _ = tx.send(Err(classify_transport_error(e)));
                return;
            }
        };

        let text = match std::str::from_utf8(&chunk) {
            Ok(s) => s.to_string(),
            Err(_) => continue,
        };

        buffer.push_str(&text);

        while let Some(pos) = buffer.find("\n\n") {
            let event_block = buffer[..pos].to_string();
            buffer = buffer[pos + 2..].to_string();
            if !process_sse_event(&event_block, &tx) {
                return;
            }
        }
    }

    // Process any remaining partial event in the buffer.
    if !buffer.is_empty() {
        process_sse_event(&buffer, &tx);
    }
}

/// Process a single SSE event block. Returns false when the stream is done.
fn process_sse_event(event_block: &str, tx: &mpsc::UnboundedSender<Result<ResponseDelta>>) -> bool {
    let mut data_lines: Vec<&str> = Vec::new();

    for line in event_block.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim());
        }
        // Lines starting with `:` are SSE comments; all others are ignored.
    }

    let data = data_lines.join("\n");
    if data.is_empty() {
        return true;
    }
    if data == "[DONE]" {
        return false;
    }

    match serde_json::from_str::<StreamChunk>(&data) {
        Ok(chunk) => {
            if let Some(choice) = chunk.choices.into_iter().next() {
                if tx.send(Ok(choice.delta)).is_err() {
                    return false;
                }
            }
        }
        Err(e) => {
            tracing::warn!("Skipping undecodable stream chunk: {}", e);
        }
    }
    true
}
