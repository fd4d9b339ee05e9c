// ABOUTME: Streams a one-off prompt through the active backend to stdout.
// ABOUTME: Usage: run-query <prompt...>

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use laws_agent::{stream, AgentConfig, BackendRegistry, QueryOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if prompt.is_empty() {
        eprintln!("Usage: run-query <prompt>");
        std::process::exit(1);
    }

    let config = Arc::new(AgentConfig::resolve()?);
    let registry = BackendRegistry::new(config);

    println!("\n--- Query: {prompt} ---\n");
    let start = Instant::now();

    let mut deltas = stream::text_stream(&registry, QueryOptions::new(prompt));
    let mut stdout = std::io::stdout();
    while let Some(delta) = deltas.recv().await {
        stdout.write_all(delta?.as_bytes())?;
        stdout.flush()?;
    }

    println!("\n\n--- Done ({:.1}s) ---", start.elapsed().as_secs_f64());
    Ok(())
}
