//! Isoserve - static file server for cross-origin isolated pages
//!
//! Serves the directory containing this executable on localhost and adds
//! the COOP/COEP headers browsers require before enabling
//! `SharedArrayBuffer` and threaded WASM.

mod signals;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use isoserve_core::config::{ServerConfig, DEFAULT_PORT};
use isoserve_http::Server;

use crate::signals::SignalWatcher;

/// Isoserve - local static file server with cross-origin isolation headers
#[derive(Parser)]
#[command(name = "isoserve")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout only carries the status lines.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::new("info"))
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::default().with_port(cli.port);

    tracing::info!("🚀 Starting isoserve v{}", isoserve_core::VERSION);

    let server = Server::bind(&config)
        .with_context(|| format!("Failed to start server on {}", config.addr()))?;
    let shutdown = server.shutdown_handle();

    let watcher = SignalWatcher::install().context("Failed to install signal handlers")?;
    let watcher = tokio::spawn(watcher.run(shutdown.clone()));

    println!("Server running at http://{}", server.local_addr());
    println!("Serving files from {}", server.root().display());

    let result = server.run().await;
    watcher.abort();
    result?;

    tracing::info!("👋 Shutdown complete");
    println!("Server stopped.");
    Ok(())
}
