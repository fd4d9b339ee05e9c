// ABOUTME: Per-request query options and the closed set of backend identifiers.
// ABOUTME: Options are built once per chat request and stay immutable for its lifetime.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// The two interchangeable agent execution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Claude,
    Cline,
}

impl BackendKind {
    /// Parse a backend name; unrecognized names fall back to the hosted backend.
    pub fn from_name(name: &str) -> Self {
        match name {
            "cline" => BackendKind::Cline,
            _ => BackendKind::Claude,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Claude => "claude",
            BackendKind::Cline => "cline",
        }
    }
}

/// Options for a single agent query.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub prompt: String,
    /// Fires when the caller goes away; observed at every suspension point.
    pub cancel: CancellationToken,
    pub max_turns: Option<u32>,
    /// Override which backend to use for this request.
    pub backend: Option<BackendKind>,
    /// Override the model (passed to the active backend).
    pub model: Option<String>,
}

impl QueryOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            cancel: CancellationToken::new(),
            max_turns: None,
            backend: None,
            model: None,
        }
    }
}
