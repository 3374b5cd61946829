//! GymPulse server - hosts the workout session player for the athlete UI.

use anyhow::Result;
use clap::Parser;
use gympulse_server::{build_router, config::Config, logging, state::AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use logging::{LogConfig, LogFormat, LogPreset};

/// GymPulse server - guided workout session player.
#[derive(Parser, Debug)]
#[command(name = "gympulse-server")]
#[command(about = "HTTP/WebSocket host for the guided workout session player")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override port from config
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the coach backend URL
    #[arg(long, value_name = "URL")]
    backend_url: Option<String>,

    /// Serve workouts from a local JSON catalog instead of the backend
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging (clock ticks stay off)
    #[arg(short, long)]
    debug: bool,

    /// Enable trace logging, including every clock tick
    #[arg(long)]
    trace: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long)]
    quiet: bool,

    /// Per-target level, e.g. "clock=debug". Repeatable; "gympulse::" is prepended.
    #[arg(long = "log", value_name = "TARGET=LEVEL")]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let preset = LogPreset::from_flags(cli.verbose, cli.debug, cli.trace, cli.quiet);
    logging::init(&LogConfig::new(preset, &cli.log_overrides, cli.log_format));

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }
    if let Some(catalog) = cli.catalog {
        config.catalog_path = Some(catalog);
    }

    match &config.catalog_path {
        Some(path) => tracing::info!(
            target: "gympulse::startup",
            "Loaded configuration (port: {}, catalog: {})",
            config.port,
            path.display()
        ),
        None => tracing::info!(
            target: "gympulse::startup",
            "Loaded configuration (port: {}, backend: {})",
            config.port,
            config.backend_url
        ),
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(AppState::new(config)?);
    tracing::info!(target: "gympulse::startup", "Initialized session player");

    let app = build_router(state);

    tracing::info!(target: "gympulse::startup", "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
