//! Client side of the relay: the hosted chat-completion API.
//!
//! - [`protocol`]: Wire types for requests and streamed response chunks
//! - [`client`]: Streaming chat client built on reqwest and SSE

pub mod client;
pub mod protocol;
