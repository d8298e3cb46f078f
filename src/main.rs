//! Figma MCP proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────┐
//!                 │                     FIGMA MCP PROXY                       │
//!                 │                                                           │
//!  GET /sse       │  ┌─────────┐    ┌───────────┐    ┌──────────────────┐    │
//!  ───────────────┼─▶│  http   │───▶│  session  │───▶│    transport     │────┼──▶ event stream
//!                 │  │ server  │    │ lifecycle │    │ outbound channel │    │
//!                 │  └────┬────┘    └─────┬─────┘    └────────▲─────────┘    │
//!                 │       │               │ inbound worker    │ replies      │
//!  POST /message  │  ┌────▼────┐    ┌─────▼─────┐    ┌────────┴─────────┐    │
//!  ───────────────┼─▶│ routing │───▶│   queue   │───▶│  engine (MCP)    │────┼──▶ Figma REST API
//!                 │  └─────────┘    └───────────┘    └──────────────────┘    │
//!                 │                                                           │
//!                 │   config · observability · lifecycle (signals/shutdown)  │
//!                 └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use figma_mcp_proxy::config::load_config;
use figma_mcp_proxy::engine::McpEngineFactory;
use figma_mcp_proxy::figma::FigmaClient;
use figma_mcp_proxy::observability::{logging, metrics};
use figma_mcp_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "figma-mcp-proxy", version, about = "MCP server for the Figma API over Server-Sent Events")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logging is configured by the file, so config errors go straight to stderr.
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("figma-mcp-proxy: {err}");
            std::process::exit(1);
        }
    };

    logging::init(&config.observability)?;
    tracing::info!("figma-mcp-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        grace_period_ms = config.session.grace_period_ms,
        api_base = %config.figma.api_base,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(err) = metrics::init_metrics(addr) {
                    tracing::error!(error = %err, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let figma = Arc::new(FigmaClient::new(&config.figma)?);
    let engines = Arc::new(McpEngineFactory::new(figma, &config.figma));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(&config, engines);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
