//! Image Asset Proxy
//!
//! Accepts `GET /<hex(url)>` or `GET /?url=<url>`, fetches the image on the
//! caller's behalf and streams it back.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                     ASSET PROXY                      │
//!                     │                                                      │
//!   Client Request    │  ┌─────────┐   ┌──────────┐   ┌───────────────┐      │
//!   ──────────────────┼─▶│ decode  │──▶│   host   │──▶│   forward     │──────┼──▶ Upstream
//!                     │  │ target  │   │ validator│   │ (redirects    │      │    (image host)
//!                     │  └─────────┘   └────▲─────┘   │  re-validated)│      │
//!                     │                     │         └───────┬───────┘      │
//!                     │                     └─────────────────┘              │
//!                     │                                       │              │
//!   Client Response   │  ┌─────────┐   ┌──────────┐           ▼              │
//!   ◀─────────────────┼──│ capped  │◀──│ response │◀──── upstream response   │
//!                     │  │ stream  │   │  filter  │                          │
//!                     │  └─────────┘   └──────────┘                          │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use asset_proxy::config::load_config;
use asset_proxy::lifecycle::{signals, Shutdown};
use asset_proxy::observability::{logging, metrics};
use asset_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "asset-proxy")]
#[command(about = "Image asset proxy with private-network protection", long_about = None)]
struct Cli {
    /// Optional TOML configuration file. `PORT` overrides the listener port.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init(&config.observability.log_level);
    tracing::info!("asset-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        max_content_length = config.limits.max_content_length,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    // Bind failure is fatal.
    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        signals::shutdown_on_signal(&shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
