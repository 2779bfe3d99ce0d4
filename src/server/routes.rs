//! HTTP API: the ask endpoint, health check, and the static browser client.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::prompt::{AskRequest, Prompt, PromptError};
use crate::server::streaming::relay_sse_stream;
use crate::upstream::client::{ChatClient, UpstreamError};

/// Application state shared across handlers.
pub struct AppState {
    pub client: ChatClient,
    pub config: Arc<Config>,
    pub start_time: Instant,
}

/// Build the axum router with all routes and middleware.
///
/// Everything that is not an API route falls through to the static file
/// service, which serves the browser client at `/`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    Router::new()
        .route("/ask", post(ask))
        .route("/health", get(health))
        .fallback_service(ServeDir::new(static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// ─── Errors ────────────────────────────────────────────────────────────────

/// Failures surfaced before the response enters streaming mode. Anything
/// after that point degrades to an error frame on the stream instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    BadRequest(#[from] PromptError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// ─── Route Handlers ────────────────────────────────────────────────────────

/// Relay one ask to the upstream model and stream the answer back as SSE.
async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4().to_string();

    let prompt = Prompt::from_request(req)?;

    info!(
        request_id = %request_id,
        kind = prompt.kind(),
        model = %state.config.upstream.model,
        "Ask request"
    );

    let messages = prompt.into_messages(&state.config.prompt);

    let rx = match state.client.stream_chat(messages).await {
        Ok(rx) => rx,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Upstream call failed before streaming");
            return Err(e.into());
        }
    };

    // From here on the response is an event stream; later failures arrive as
    // error frames, not as HTTP errors.
    let stream = relay_sse_stream(rx, request_id);
    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response())
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub model: String,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        model: state.config.upstream.model.clone(),
    })
}
