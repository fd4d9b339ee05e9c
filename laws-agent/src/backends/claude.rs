// ABOUTME: Hosted-agent backend - spawns the claude runtime with --output-format stream-json.
// ABOUTME: Normalizes its cumulative message shapes into suffix deltas via DeltaTracker.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::backend::TextStream;
use crate::config::{AgentConfig, ALLOWED_TOOLS, DEFAULT_MAX_TURNS, DEFAULT_MODEL};
use crate::query::QueryOptions;

/// Messages the hosted runtime emits, reduced to the two shapes that carry
/// response text. Every other discriminant is ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuntimeMessage {
    /// Final-result object carrying the entire response text so far.
    Result {
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        error: Option<String>,
    },
    /// Cumulative assistant content carrying an ordered list of typed blocks.
    Assistant { message: AssistantMessage },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Tracks the longest full text observed for one request and emits only the
/// strictly-longer suffix.
///
/// Both recognized message shapes go through the same rule, so text already
/// sent is never re-emitted even when the shapes interleave within a response.
#[derive(Debug, Default)]
pub struct DeltaTracker {
    seen: usize,
}

impl DeltaTracker {
    pub fn push(&mut self, full_text: &str) -> Option<String> {
        if full_text.len() <= self.seen {
            return None;
        }
        let delta = full_text.get(self.seen..)?.to_string();
        self.seen = full_text.len();
        Some(delta)
    }
}

/// Derive the delta (if any) a runtime message contributes to the response.
pub fn delta_for(msg: &RuntimeMessage, tracker: &mut DeltaTracker) -> Result<Option<String>> {
    match msg {
        RuntimeMessage::Result {
            is_error: true,
            error,
            result,
        } => {
            let message = error
                .clone()
                .or_else(|| result.clone())
                .unwrap_or_else(|| "Unknown error".to_string());
            anyhow::bail!("claude runtime error: {message}");
        }
        RuntimeMessage::Result {
            result: Some(full), ..
        } => Ok(tracker.push(full)),
        RuntimeMessage::Result { .. } => Ok(None),
        RuntimeMessage::Assistant { message } => {
            let full: String = message
                .content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::Other => None,
                })
                .collect();
            Ok(tracker.push(&full))
        }
        RuntimeMessage::Other => Ok(None),
    }
}

pub struct ClaudeBackend {
    config: Arc<AgentConfig>,
}

impl ClaudeBackend {
    pub fn new(config: Arc<AgentConfig>) -> Self {
        Self { config }
    }

    pub fn text_stream(&self, opts: QueryOptions) -> TextStream {
        let (tx, rx) = mpsc::channel(64);
        let config = Arc::clone(&self.config);
        tokio::spawn(async move {
            if let Err(e) = run_query(&config, &opts, &tx).await {
                let _ = tx.send(Err(e)).await;
            }
        });
        TextStream::new(rx)
    }
}

async fn run_query(
    config: &AgentConfig,
    opts: &QueryOptions,
    tx: &mpsc::Sender<Result<String>>,
) -> Result<()> {
    let system_prompt = std::fs::read_to_string(&config.system_prompt_path).with_context(|| {
        format!(
            "Failed to read system prompt: {}",
            config.system_prompt_path.display()
        )
    })?;

    let model = opts
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let max_turns = opts.max_turns.unwrap_or(DEFAULT_MAX_TURNS);

    let args = vec![
        "--print".to_string(),
        "--output-format".to_string(),
        "stream-json".to_string(),
        "--verbose".to_string(),
        "--dangerously-skip-permissions".to_string(),
        "--allowedTools".to_string(),
        ALLOWED_TOOLS.join(","),
        "--append-system-prompt".to_string(),
        system_prompt,
        "--model".to_string(),
        model,
        "--max-turns".to_string(),
        max_turns.to_string(),
        opts.prompt.clone(),
    ];

    tracing::debug!(binary = %config.claude_bin, "Spawning claude runtime");

    let mut child = Command::new(&config.claude_bin)
        .args(&args)
        .current_dir(&config.workspace_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to spawn claude runtime: {}", config.claude_bin))?;

    let stdout = child.stdout.take().context("Failed to capture stdout")?;
    let stderr = child.stderr.take().context("Failed to capture stderr")?;

    let stderr_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if !line.is_empty() {
                tracing::warn!(stderr = %line, "claude runtime stderr");
            }
        }
    });

    let mut lines = BufReader::new(stdout).lines();
    let mut tracker = DeltaTracker::default();
    let mut cancelled = false;

    loop {
        let line = tokio::select! {
            _ = opts.cancel.cancelled() => {
                tracing::debug!("Query cancelled, terminating claude runtime");
                cancelled = true;
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        if line.is_empty() {
            continue;
        }

        let Ok(msg) = serde_json::from_str::<RuntimeMessage>(&line) else {
            continue;
        };
        if let Some(delta) = delta_for(&msg, &mut tracker)? {
            if tx.send(Ok(delta)).await.is_err() {
                tracing::debug!("Delta receiver closed, stopping stream");
                cancelled = true;
                break;
            }
        }
    }

    if cancelled {
        let _ = child.start_kill();
        let _ = child.wait().await;
        stderr_handle.abort();
        return Ok(());
    }

    let status = child.wait().await?;
    if let Err(e) = stderr_handle.await {
        tracing::warn!(error = %e, "stderr reader task failed to complete");
    }
    if !status.success() {
        anyhow::bail!("claude runtime exited with status: {:?}", status.code());
    }

    Ok(())
}
