//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! This binary reads `CommandEnvelope` messages as newline-delimited JSON
//! from stdin, dispatches them through the memory host channel, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages to stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::sync::Arc;
use voluma::config::VolumaConfig;
use voluma::host::{StoreHostHandler, run_stdio_bridge};
use voluma::storage::JsonFileStore;
use voluma::tabs::NoBadge;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let root = VolumaConfig::default().storage.resolve_root();
    let config = VolumaConfig::load_or_default(&root.join("config.toml"))?;
    let store_root = config.storage.resolve_root();

    tracing::info!(store = %store_root.display(), "voluma-host starting");

    let store = Arc::new(JsonFileStore::new(&store_root));
    let handler = StoreHostHandler::new(store, NoBadge);

    run_stdio_bridge(handler).await.map_err(|e| {
        tracing::error!(error = %e, "voluma-host exited with error");
        anyhow::anyhow!("voluma-host failed: {e}")
    })?;

    tracing::info!("voluma-host shut down cleanly");
    Ok(())
}
