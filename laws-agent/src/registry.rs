// ABOUTME: Memoized backend registry keyed by BackendKind.
// ABOUTME: OnceLock get-or-init builds at most one instance per kind under concurrent first use.

use std::sync::{Arc, OnceLock};

use crate::backend::Backend;
use crate::backends::claude::ClaudeBackend;
use crate::backends::cline::ClineBackend;
use crate::config::AgentConfig;
use crate::query::BackendKind;

/// Registry holding one lazily-built instance per backend kind.
///
/// Instances are stateless across requests, so sharing them is safe; all
/// per-request state lives in QueryOptions and the streaming task.
pub struct BackendRegistry {
    config: Arc<AgentConfig>,
    claude: OnceLock<Backend>,
    cline: OnceLock<Backend>,
}

impl BackendRegistry {
    pub fn new(config: Arc<AgentConfig>) -> Self {
        Self {
            config,
            claude: OnceLock::new(),
            cline: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Resolve a backend kind to its memoized instance, creating it on first use.
    pub fn resolve(&self, kind: BackendKind) -> &Backend {
        match kind {
            BackendKind::Claude => self
                .claude
                .get_or_init(|| Backend::Claude(ClaudeBackend::new(Arc::clone(&self.config)))),
            BackendKind::Cline => self
                .cline
                .get_or_init(|| Backend::Cline(ClineBackend::new(Arc::clone(&self.config)))),
        }
    }
}
