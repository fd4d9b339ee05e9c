// ABOUTME: HTTP chat endpoint streaming agent responses as SSE UI events.
// ABOUTME: POST /api/chat takes a message history; client disconnect cancels the backend.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::stream::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use laws_agent::{stream, BackendKind, BackendRegistry, QueryOptions, UiStreamEvent};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BackendRegistry>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<UiMessage>,
    #[serde(default)]
    pub backend: Option<BackendKind>,
    #[serde(default)]
    pub model: Option<String>,
}

/// One message of the chat history as the UI sends it.
#[derive(Debug, Deserialize)]
pub struct UiMessage {
    pub role: String,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePart {
    Text { text: String },
    #[serde(other)]
    Other,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn chat(State(state): State<AppState>, Json(body): Json<ChatRequest>) -> Response {
    let Some(prompt) = extract_prompt(&body.messages) else {
        return (StatusCode::BAD_REQUEST, "No user message found").into_response();
    };

    let cancel = CancellationToken::new();
    let opts = QueryOptions {
        prompt,
        cancel: cancel.clone(),
        max_turns: None,
        backend: body.backend,
        model: body.model,
    };

    let (tx, rx) = mpsc::channel(64);
    let registry = Arc::clone(&state.registry);
    tokio::spawn(async move {
        if let Err(e) = stream::write_to_ui_stream(&registry, opts, tx).await {
            tracing::error!(error = %e, "Agent query failed");
        }
    });

    Sse::new(event_stream(rx, cancel)).into_response()
}

/// Newline-joined text parts of the most recent user message, or None when
/// that message holds no text.
pub fn extract_prompt(messages: &[UiMessage]) -> Option<String> {
    let last_user = messages.iter().rev().find(|m| m.role == "user")?;
    let text = last_user
        .parts
        .iter()
        .filter_map(|part| match part {
            MessagePart::Text { text } => Some(text.as_str()),
            MessagePart::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Turns the UI event channel into an SSE stream. The drop guard cancels the
/// query when the response body is dropped (client disconnect).
fn event_stream(
    rx: mpsc::Receiver<UiStreamEvent>,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let guard = cancel.drop_guard();
    futures_util::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let event = rx.recv().await?;
        match Event::default().json_data(&event) {
            Ok(sse_event) => Some((Ok(sse_event), (rx, guard))),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode UI event");
                None
            }
        }
    })
}
