// ABOUTME: Cline CLI backend - spawns cline with --json and parses its NDJSON stdout.
// ABOUTME: Emits say-record text verbatim; timeout and cancellation both terminate the child.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::backend::TextStream;
use crate::config::AgentConfig;
use crate::query::QueryOptions;

/// Cline `say` kinds that carry actual response text.
const TEXT_SAY_KINDS: &[&str] = &["text", "reasoning", "completion_result"];

/// One NDJSON record on cline stdout. Only `say` and `error` records matter;
/// every other discriminant (task, api_req_started, ...) is ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClineRecord {
    Say {
        #[serde(default)]
        say: String,
        #[serde(default)]
        text: Option<String>,
    },
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Other,
}

pub struct ClineBackend {
    config: Arc<AgentConfig>,
}

impl ClineBackend {
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

fn build_args(config: &AgentConfig, opts: &QueryOptions) -> Vec<String> {
    let cline = &config.cline;
    let mut args = vec![
        "--json".to_string(),
        "-y".to_string(),
        "-c".to_string(),
        config.workspace_dir.display().to_string(),
    ];
    if let Some(model) = opts.model.as_ref().or(cline.model.as_ref()) {
        args.push("-m".to_string());
        args.push(model.clone());
    }
    if cline.timeout_secs > 0 {
        args.push("--timeout".to_string());
        args.push(cline.timeout_secs.to_string());
    }
    if let Some(dir) = &cline.config_dir {
        args.push("--config".to_string());
        args.push(dir.clone());
    }
    args.push(opts.prompt.clone());
    args
}

async fn run_query(
    config: &AgentConfig,
    opts: &QueryOptions,
    tx: &mpsc::Sender<Result<String>>,
) -> Result<()> {
    let args = build_args(config, opts);
    tracing::debug!(binary = %config.cline.bin, "Spawning cline CLI");

    let mut child = match Command::new(&config.cline.bin)
        .args(&args)
        .current_dir(&config.workspace_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            bail!(
                "Cline binary not found: \"{}\". Install Cline or set CLINE_BIN.",
                config.cline.bin
            );
        }
        Err(e) => return Err(e).context("Failed to spawn cline CLI"),
    };

    let stdout = child.stdout.take().context("Failed to capture stdout")?;
    let stderr = child.stderr.take().context("Failed to capture stderr")?;

    let stderr_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if !line.is_empty() {
                tracing::warn!(stderr = %line, "cline stderr");
            }
        }
    });

    let timeout = tokio::time::sleep(Duration::from_secs(config.cline.timeout_secs));
    tokio::pin!(timeout);

    let mut lines = BufReader::new(stdout).lines();
    let mut interrupted = false;

    loop {
        let line = tokio::select! {
            _ = opts.cancel.cancelled() => {
                tracing::debug!("Query cancelled, terminating cline");
                interrupted = true;
                break;
            }
            _ = &mut timeout => {
                tracing::warn!(timeout_secs = config.cline.timeout_secs, "Cline query timed out, terminating");
                interrupted = true;
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        // Non-JSON diagnostic lines are expected; skip them.
        let Ok(record) = serde_json::from_str::<ClineRecord>(&line) else {
            continue;
        };
        match record {
            ClineRecord::Say {
                say,
                text: Some(text),
            } if TEXT_SAY_KINDS.contains(&say.as_str()) && !text.is_empty() => {
                if tx.send(Ok(text)).await.is_err() {
                    tracing::debug!("Delta receiver closed, stopping stream");
                    interrupted = true;
                    break;
                }
            }
            ClineRecord::Error {
                message: Some(message),
            } => {
                bail!("Cline error: {message}");
            }
            _ => {}
        }
    }

    if interrupted {
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
        bail!("Cline process exited with code {:?}", status.code());
    }

    Ok(())
}
