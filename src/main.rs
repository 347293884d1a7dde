//! meshgate
//!
//! API gateway front door: every request gets a correlation id, a timing
//! header and exactly one outcome record; upstream health is aggregated on
//! demand.
//!
//! ```text
//!     Client ──▶ tracing ─▶ cors ─▶ timeout ─▶ rate limit ─▶ handlers
//!                   │                                          │
//!                   ▼                                          ▼
//!              MetricSink ─▶ /stats, Prometheus          RouteRegistry
//!                                                         GatewayRouter ─▶ upstream /healthz
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use meshgate::config::{config_from_env, load_config};
use meshgate::lifecycle::{wait_for_termination, Shutdown};
use meshgate::observability::{logging::init_logging, metrics::init_metrics};
use meshgate::GatewayServer;

#[derive(Parser, Debug)]
#[command(name = "meshgate", version, about = "API gateway with request tracing")]
struct Args {
    /// Path to the TOML config file. Defaults plus MESHGATE_* variables are
    /// used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => config_from_env()?,
    };

    init_logging(&config.observability)?;

    tracing::info!(
        service = %config.service.name,
        version = %config.service.version,
        "meshgate starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        probe_timeout_ms = config.health_check.timeout_ms,
        request_timeout_secs = config.timeouts.request_secs,
        rate_limiting = config.features.rate_limiting,
        caching = config.features.caching,
        cors = config.features.cors,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GatewayServer::new(config)?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_termination().await;
        shutdown.trigger("termination signal");
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
