// ABOUTME: Entry point for the laws-chat web server.
// ABOUTME: Initializes logging, resolves workspace config, and serves the chat API.

use std::sync::Arc;

use anyhow::{Context, Result};
use laws_agent::{AgentConfig, BackendRegistry};
use laws_chat::routes::{router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Log panics before they crash the process
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC! {panic_info}");
        eprintln!("{:?}", std::backtrace::Backtrace::force_capture());
    }));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = AgentConfig::resolve()?;
    tracing::info!(
        workspace = %config.workspace_dir.display(),
        backend = config.default_backend.name(),
        "Configuration loaded"
    );

    let state = AppState {
        registry: Arc::new(BackendRegistry::new(Arc::new(config))),
    };

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "laws-chat listening");

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}
