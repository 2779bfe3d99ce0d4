//! Streaming chat client for the OpenAI-compatible API.
//!
//! Opens a streamed chat completion and pumps the incremental fragments
//! through a bounded channel:
//! 1. POST the request; any failure before the stream is accepted is
//!    returned directly to the caller.
//! 2. Once accepted, a spawned task parses the SSE body and forwards each
//!    text fragment in arrival order.
//! 3. The channel is bounded, so the task pulls upstream bytes no faster
//!    than the receiver drains them. If the receiver is dropped, the task
//!    stops and the upstream request is abandoned.

use std::time::Duration;

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::stream::Stream;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::upstream::protocol::{ChatCompletionChunk, ChatMessage, ChatRequest};

/// Terminal sentinel the upstream emits after the last chunk.
const DONE_SENTINEL: &str = "[DONE]";

/// Bound on in-flight fragments between the upstream reader and the
/// downstream writer.
const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no API credential configured")]
    MissingCredential,

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream authentication failed")]
    Auth,

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream stream failed: {0}")]
    Stream(String),

    #[error("upstream stream ended unexpectedly")]
    Interrupted,

    #[error("malformed upstream payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// An event from an open chat stream.
#[derive(Debug)]
pub enum ChatStreamEvent {
    /// A new text fragment arrived.
    Fragment(String),
    /// The upstream finished normally.
    Done,
    /// The stream failed after it was accepted.
    Error(UpstreamError),
}

/// Streaming client for the upstream chat-completion API.
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl ChatClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(UpstreamError::MissingCredential)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// Construct the API URL for a given path. Tolerates a trailing slash or
    /// a pre-existing `/v1` suffix on the base URL.
    fn api_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = base.strip_suffix("/v1").unwrap_or(base);
        format!("{}/v1/{}", base, path.trim_start_matches('/'))
    }

    /// Open a streamed chat completion for the given message sequence.
    ///
    /// Returns a receiver of in-order [`ChatStreamEvent`]s once the upstream
    /// has accepted the request. Failures before that point are returned as
    /// an error; failures after it arrive through the channel.
    pub async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<mpsc::Receiver<ChatStreamEvent>, UpstreamError> {
        let url = self.api_url("chat/completions");
        let body = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: true,
        };

        debug!(url = %url, model = %self.model, "Opening upstream chat stream");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(UpstreamError::Auth);
            }
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let byte_stream = response.bytes_stream();
        tokio::spawn(async move {
            pump_sse(byte_stream, tx).await;
        });

        Ok(rx)
    }
}

/// Parse an SSE byte stream into chat events, forwarding them in arrival
/// order until the `[DONE]` sentinel, an error, or receiver drop.
async fn pump_sse<S, E>(stream: S, tx: mpsc::Sender<ChatStreamEvent>)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    let mut events = Box::pin(stream.eventsource());

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                let _ = tx
                    .send(ChatStreamEvent::Error(UpstreamError::Stream(e.to_string())))
                    .await;
                return;
            }
        };

        if event.data == DONE_SENTINEL {
            let _ = tx.send(ChatStreamEvent::Done).await;
            return;
        }

        let chunk: ChatCompletionChunk = match serde_json::from_str(&event.data) {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx
                    .send(ChatStreamEvent::Error(UpstreamError::InvalidPayload(e)))
                    .await;
                return;
            }
        };

        // Role-only and empty deltas carry no text.
        let Some(text) = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
        else {
            continue;
        };
        if text.is_empty() {
            continue;
        }

        if tx.send(ChatStreamEvent::Fragment(text)).await.is_err() {
            // Receiver dropped: the downstream client went away. Stop
            // pulling so the upstream request is aborted.
            return;
        }
    }

    // Byte stream ended without the [DONE] sentinel.
    let _ = tx.send(ChatStreamEvent::Error(UpstreamError::Interrupted)).await;
}
