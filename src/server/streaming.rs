//! SSE framing for the downstream relay.
//!
//! Converts a channel of chat stream events into the event-stream format the
//! browser client consumes: one `{"chunk": ...}` event per fragment in
//! arrival order, a terminal `{"done": true}` on normal completion, and a
//! `{"error": ...}` event if the stream fails after it has started.

use axum::response::sse::Event;
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::warn;

use crate::upstream::client::ChatStreamEvent;

#[derive(Debug, Serialize)]
struct ChunkFrame {
    chunk: String,
}

#[derive(Debug, Serialize)]
struct DoneFrame {
    done: bool,
}

#[derive(Debug, Serialize)]
struct ErrorFrame {
    error: String,
}

/// JSON payload for one relay frame.
///
/// Upstream error details are logged but not forwarded; the client only
/// learns that the stream failed.
fn frame_json(event: ChatStreamEvent, request_id: &str) -> String {
    let json = match event {
        ChatStreamEvent::Fragment(chunk) => serde_json::to_string(&ChunkFrame { chunk }),
        ChatStreamEvent::Done => serde_json::to_string(&DoneFrame { done: true }),
        ChatStreamEvent::Error(e) => {
            warn!(request_id = %request_id, error = %e, "Upstream stream failed mid-relay");
            serde_json::to_string(&ErrorFrame {
                error: "upstream stream failed".to_string(),
            })
        }
    };
    json.unwrap_or_default()
}

/// Convert a chat event receiver into the downstream SSE stream.
///
/// Events are framed one-for-one in receipt order. The channel feeding the
/// receiver is bounded, so upstream consumption stays in step with however
/// fast the downstream client reads. The stream ends when the sender side
/// closes, after either a done or an error frame.
pub fn relay_sse_stream(
    rx: mpsc::Receiver<ChatStreamEvent>,
    request_id: String,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    ReceiverStream::new(rx)
        .map(move |event| Ok(Event::default().data(frame_json(event, &request_id))))
}
