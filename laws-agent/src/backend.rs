// ABOUTME: Closed backend variant type plus the TextStream delta receiver.
// ABOUTME: Backends hold no per-request state; each text_stream call spawns its own task.

use tokio::sync::mpsc;

use crate::backends::claude::ClaudeBackend;
use crate::backends::cline::ClineBackend;
use crate::query::QueryOptions;

/// One of the two agent execution strategies.
pub enum Backend {
    Claude(ClaudeBackend),
    Cline(ClineBackend),
}

impl Backend {
    /// Backend name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Claude(_) => "claude",
            Backend::Cline(_) => "cline",
        }
    }

    /// Run a query, yielding incremental text deltas.
    pub fn text_stream(&self, opts: QueryOptions) -> TextStream {
        match self {
            Backend::Claude(backend) => backend.text_stream(opts),
            Backend::Cline(backend) => backend.text_stream(opts),
        }
    }
}

/// Receiver for the delta stream of one query.
///
/// Deltas arrive strictly in emission order; concatenated they reconstruct the
/// full response text exactly once. The stream ends after the first `Err` or
/// when the backend task finishes.
pub struct TextStream {
    rx: mpsc::Receiver<anyhow::Result<String>>,
}

impl TextStream {
    pub fn new(rx: mpsc::Receiver<anyhow::Result<String>>) -> Self {
        Self { rx }
    }

    /// Receive the next delta, or None when the stream is finished.
    pub async fn recv(&mut self) -> Option<anyhow::Result<String>> {
        self.rx.recv().await
    }

    /// Collect the remaining deltas into the full response text.
    pub async fn collect_text(mut self) -> anyhow::Result<String> {
        let mut text = String::new();
        while let Some(delta) = self.recv().await {
            text.push_str(&delta?);
        }
        Ok(text)
    }
}
