//! Origin proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::inbound ──▶ proxy::forwarder ──▶ proxy::client ──▶ Origin
//!                     (trace, req-id)  (mount, path-info)  (url, headers,      (pool, timeouts,
//!                                                           cookies, body)      redirects)
//!     Client Response
//!     ◀────────────── http::server ◀── http::body ◀────── proxy::forwarder ◀── proxy::client ◀── Origin
//!                                      (relay, 304)       (Location, Set-Cookie)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use origin_proxy::config::{load_config, ProxyConfig};
use origin_proxy::http::HttpServer;
use origin_proxy::lifecycle::{signals, Shutdown};
use origin_proxy::observability;

#[derive(Parser)]
#[command(name = "origin-proxy", version, about = "HTTP reverse proxy for a single origin")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config: ProxyConfig = load_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    observability::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "origin-proxy starting");

    tracing::info!(
        name = %config.name,
        target = %config.target_uri,
        bind_address = %config.listener.bind_address,
        mount_path = %config.listener.mount_path,
        "Configuration loaded"
    );

    let server = HttpServer::new(config)?;
    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;

    let shutdown = Shutdown::new();
    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
