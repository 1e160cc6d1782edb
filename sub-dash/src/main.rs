//! sub-dash - Live view of recorded posting activity

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use libsubcast::dashboard::Dashboard;
use libsubcast::{logging, Config};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sub-dash")]
#[command(version)]
#[command(about = "Serve a live dashboard of recorded posting activity")]
#[command(long_about = "\
sub-dash - Serve a live dashboard of recorded posting activity

DESCRIPTION:
    sub-dash watches the events file written by sub-post and serves a web
    page with post counters and a table of recent attempts. The file is
    re-read whenever it changes; a partially written or invalid file is
    ignored until the next valid version appears.

ENDPOINTS:
    GET /            HTML dashboard
    GET /api/events  Cached events as a JSON array
    GET /api/status  events_count, last_update, server_time

USAGE:
    sub-dash
    sub-dash --events ~/subcast/events.json --port 8080
")]
struct Cli {
    /// Events file to watch (created as [] if missing)
    #[arg(short, long, value_name = "PATH")]
    events: Option<PathBuf>,

    /// Listen address
    #[arg(short, long)]
    address: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Milliseconds between checks of the events file
    #[arg(long, value_name = "MS")]
    poll_interval: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::from_env(cli.verbose).init();

    let mut config = Config::load().context("Failed to load settings")?.dashboard;
    if let Some(events) = cli.events {
        config.events_path = events.display().to_string();
    }
    if let Some(address) = cli.address {
        config.address = address;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(interval) = cli.poll_interval {
        config.poll_interval_ms = interval;
    }

    info!("sub-dash starting, watching {}", config.events_path);

    let dashboard = Dashboard::start(config.clone())
        .await
        .with_context(|| format!("Failed to prepare events file {}", config.events_path))?;
    dashboard.serve().await.context("Dashboard server failed")?;

    info!("sub-dash stopped");
    Ok(())
}
