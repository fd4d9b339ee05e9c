// ABOUTME: Backend-agnostic facade: one seam producing text deltas for any backend.
// ABOUTME: Also frames deltas into the start/delta/end UI stream envelope.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::backend::TextStream;
use crate::query::QueryOptions;
use crate::registry::BackendRegistry;

/// Part identifier used for the single text part of a response.
const PART_ID: &str = "part-0";

/// Wire events framing incremental text for the chat client.
///
/// Exactly one TextStart precedes the first delta and exactly one TextEnd
/// follows the last; a response that produced no text emits no events at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiStreamEvent {
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },
}

/// Runs the agent and yields plain text deltas as they appear.
/// Delegates to the requested backend, else the configured default.
pub fn text_stream(registry: &BackendRegistry, opts: QueryOptions) -> TextStream {
    let kind = opts.backend.unwrap_or(registry.config().default_backend);
    let backend = registry.resolve(kind);
    tracing::debug!(backend = backend.name(), "Dispatching query");
    backend.text_stream(opts)
}

/// Streams a query as UI events into `tx`.
pub async fn write_to_ui_stream(
    registry: &BackendRegistry,
    opts: QueryOptions,
    tx: mpsc::Sender<UiStreamEvent>,
) -> Result<()> {
    let stream = text_stream(registry, opts);
    forward_deltas(stream, tx).await
}

/// Frames a delta stream into the start/delta/end envelope.
///
/// An error delta aborts before any TextEnd is written; a closed receiver
/// (client gone) just stops consuming.
pub async fn forward_deltas(mut stream: TextStream, tx: mpsc::Sender<UiStreamEvent>) -> Result<()> {
    let mut started = false;
    while let Some(delta) = stream.recv().await {
        let delta = delta?;
        if !started {
            let start = UiStreamEvent::TextStart {
                id: PART_ID.to_string(),
            };
            if tx.send(start).await.is_err() {
                return Ok(());
            }
            started = true;
        }
        let event = UiStreamEvent::TextDelta {
            id: PART_ID.to_string(),
            delta,
        };
        if tx.send(event).await.is_err() {
            return Ok(());
        }
    }
    if started {
        let _ = tx
            .send(UiStreamEvent::TextEnd {
                id: PART_ID.to_string(),
            })
            .await;
    }
    Ok(())
}
