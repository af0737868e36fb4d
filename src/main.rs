//! Entity echo server.
//!
//! Accepts HTTP requests, seals them into the request model, and answers
//! with a JSON entity describing what was received: client address after
//! forwarded-chain resolution, scheme, method, path, query parameters,
//! cookies and the decoded body.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use http_entity::config::{load_config, validate_config, ServerConfig};
use http_entity::http::EntityServer;
use http_entity::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "http-entity", version, about = "HTTP entity echo server")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(http_entity::config::ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability);

    tracing::info!("http-entity v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        trust_depth = config.forwarding.trust_depth,
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = EntityServer::new(config);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
