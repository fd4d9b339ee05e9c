// ABOUTME: Resolves the project root via the CLAUDE.md sentinel and reads backend settings.
// ABOUTME: Env values fall back to defaults silently; a missing sentinel is fatal at startup.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::query::BackendKind;

/// Tools the agent is allowed to use.
pub const ALLOWED_TOOLS: &[&str] = &["Read", "Glob", "Grep", "Bash", "WebSearch", "WebFetch"];

/// Default model for the hosted backend.
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5";

/// Default max turns for the agent.
pub const DEFAULT_MAX_TURNS: u32 = 30;

/// Marker file that locates the project root; also serves as the system prompt.
const SENTINEL: &str = "CLAUDE.md";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Directory containing the legal-document workspace.
    pub workspace_dir: PathBuf,
    /// System prompt file handed to the hosted backend.
    pub system_prompt_path: PathBuf,
    /// Backend used when a request carries no override.
    pub default_backend: BackendKind,
    /// Binary for the hosted claude runtime.
    pub claude_bin: String,
    /// Cline CLI settings (only used when the cline backend is active).
    pub cline: ClineConfig,
}

#[derive(Debug, Clone)]
pub struct ClineConfig {
    pub bin: String,
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub config_dir: Option<String>,
}

impl AgentConfig {
    /// Resolve configuration from the current directory and environment.
    pub fn resolve() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let root = find_project_root(&cwd)?;
        Ok(Self::from_root(&root))
    }

    /// Build configuration rooted at an already-located project root.
    pub fn from_root(root: &Path) -> Self {
        Self {
            workspace_dir: root.join("workspace"),
            system_prompt_path: root.join(SENTINEL),
            default_backend: BackendKind::from_name(&env_or("AGENT_BACKEND", "claude")),
            claude_bin: env_or("CLAUDE_BIN", "claude"),
            cline: ClineConfig {
                bin: env_or("CLINE_BIN", "cline"),
                model: std::env::var("CLINE_MODEL").ok(),
                timeout_secs: timeout_from(std::env::var("CLINE_TIMEOUT").ok()),
                config_dir: std::env::var("CLINE_CONFIG").ok(),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn timeout_from(value: Option<String>) -> u64 {
    // Zero is not a usable timeout; it falls back like any other bad value.
    value
        .and_then(|v| v.parse().ok())
        .filter(|&v| v > 0)
        .unwrap_or(300)
}

/// Walk `start` and its ancestors until a directory containing CLAUDE.md is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    for dir in start.ancestors() {
        if dir.join(SENTINEL).is_file() {
            tracing::debug!(root = %dir.display(), "Found project root");
            return Ok(dir.to_path_buf());
        }
    }
    bail!(
        "Could not find project root ({} not found above {})",
        SENTINEL,
        start.display()
    );
}
