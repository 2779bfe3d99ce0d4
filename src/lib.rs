//! ask-relay: minimal ask-an-LLM web backend.
//!
//! Accepts a question (optionally with an image URL) over a single HTTP
//! endpoint, forwards it to a hosted OpenAI-compatible chat-completion API,
//! and relays the streamed answer back to the browser as Server-Sent Events.
//! Serves the static browser client alongside.

pub mod config;
pub mod prompt;
pub mod server;
pub mod upstream;
