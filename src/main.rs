//! Edge relay server.
//!
//! Answers CORS preflights and forwards `GET`/`POST <prefix>/<path>` to the
//! upstream API host, so browser clients can reach it through a relay that
//! keeps the `Authorization` header intact.
//!
//! ```text
//!   browser ──▶ relay-server ──▶ upstream API
//!     ▲   OPTIONS: 204 + CORS        │
//!     └──── JSON body or envelope ◀──┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use relay_proxy::config::load_or_default;
use relay_proxy::lifecycle::{wait_for_signal, Shutdown};
use relay_proxy::observability::{logging, metrics};
use relay_proxy::RelayServer;

#[derive(Parser)]
#[command(name = "relay-server")]
#[command(about = "CORS relay in front of the upstream API", long_about = None)]
struct Args {
    /// TOML config file (falls back to $RELAY_CONFIG, then defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_or_default(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("relay-server v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        bind_address = %config.server.bind_address,
        upstream = %config.upstream.base_url,
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.server.bind_address).await?;

    let shutdown = Shutdown::new();
    let server = RelayServer::new(config)?;
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
