// ABOUTME: Pluggable agent backend abstraction for laws-chat.
// ABOUTME: Two backends (hosted claude runtime, cline CLI) behind one delta-stream seam.

pub mod backend;
pub mod backends;
pub mod config;
pub mod query;
pub mod registry;
pub mod stream;

pub use backend::{Backend, TextStream};
pub use config::AgentConfig;
pub use query::{BackendKind, QueryOptions};
pub use registry::BackendRegistry;
pub use stream::UiStreamEvent;
