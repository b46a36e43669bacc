//! Prefix-routing HTTP gateway.
//!
//! Fronts a single host's web stack on one port: a static landing
//! page, a chat service, a web terminal and an API gateway, selected
//! per request by URL prefix.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                 PREFIX GATEWAY                   │
//!                 │                                                  │
//!  Client ────────┼─▶ net::listener ─▶ http::head (sniff+classify)   │
//!                 │         │                    │                   │
//!                 │         │ upgrade            │ plain HTTP        │
//!                 │         ▼                    ▼                   │
//!                 │   tunnel (raw TCP      http::server (axum)       │
//!                 │   splice to backend)         │                   │
//!                 │                        routing::table            │
//!                 │                         │         │              │
//!                 │                    landing     forward ──────────┼──▶ Backends
//!                 │                                                  │
//!                 │  config · health probe · lifecycle · metrics     │
//!                 └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prefix_gateway::config::{load_config, GatewayConfig};
use prefix_gateway::health::HealthProbe;
use prefix_gateway::lifecycle::signals;
use prefix_gateway::net::Listener;
use prefix_gateway::observability;
use prefix_gateway::{HttpServer, Shutdown};

/// Single-host prefix router fronting the chat, terminal and API backends.
#[derive(Parser, Debug)]
#[command(name = "prefix-gateway", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address override, e.g. 0.0.0.0:8080.
    #[arg(long)]
    listen: Option<String>,

    /// Chat backend override as host:port.
    #[arg(long)]
    chat: Option<String>,

    /// Terminal backend override as host:port.
    #[arg(long)]
    terminal: Option<String>,

    /// API gateway backend override as host:port.
    #[arg(long)]
    gateway: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prefix_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("prefix-gateway v0.1.0 starting");

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    apply_overrides(&mut config, &cli)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(error) = observability::metrics::init_exporter(addr) {
                    tracing::error!(error = %error, "Failed to install metrics exporter");
                }
            }
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let listener = Listener::bind(&config.listener).await?;
    let shutdown = Shutdown::new();

    if let Some(probe) = HealthProbe::from_config(&config) {
        let probe_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            probe.run(probe_shutdown).await;
        });
    }

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(&config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Fold CLI overrides into the loaded configuration.
fn apply_overrides(config: &mut GatewayConfig, cli: &Cli) -> Result<(), String> {
    if let Some(listen) = &cli.listen {
        config.listener.bind_address = listen.clone();
    }

    let overrides = [
        ("chat", &cli.chat),
        ("terminal", &cli.terminal),
        ("gateway", &cli.gateway),
    ];
    for (name, value) in overrides {
        let Some(value) = value else {
            continue;
        };
        let (host, port) = parse_authority(value)?;
        match config.backends.iter_mut().find(|b| b.name == name) {
            Some(backend) => {
                backend.host = host;
                backend.port = port;
            }
            None => return Err(format!("no backend named '{name}' to override")),
        }
    }
    Ok(())
}

fn parse_authority(value: &str) -> Result<(String, u16), String> {
    let Some((host, port)) = value.rsplit_once(':') else {
        return Err(format!("expected host:port, got '{value}'"));
    };
    if host.is_empty() {
        return Err(format!("expected host:port, got '{value}'"));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| format!("invalid port in '{value}'"))?;
    Ok((host.to_string(), port))
}
