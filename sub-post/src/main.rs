//! sub-post - Post a batch of submissions to Reddit communities

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use libsubcast::config::{
    expand_path, load_post_requests, write_sample_credentials, write_sample_post_config,
    DashboardConfig,
};
use libsubcast::dashboard::Dashboard;
use libsubcast::{
    logging, BatchRunner, Config, Credentials, DelayRange, Event, PostingClient, Result,
    SubcastError,
};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Spread added to `--delay` to form the wait range
const DELAY_SPREAD_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "sub-post")]
#[command(version)]
#[command(about = "Post a batch of submissions to Reddit communities")]
#[command(long_about = "\
sub-post - Post a batch of submissions to Reddit communities

DESCRIPTION:
    sub-post reads an ordered list of post requests, posts each one to its
    subreddit, waits a random number of seconds between posts, and writes
    every attempt to an events file that sub-dash can display.

    Missing credentials and post configuration files are created with
    sample values on first run. Edit them before posting.

USAGE:
    # Post with default files in the current directory
    sub-post

    # Custom files, a shorter wait and the dashboard on port 8080
    sub-post --config posts.json --delay 10 --dashboard --port 8080

    # Print the recorded events as JSON
    sub-post --format json

SIGNALS:
    SIGTERM, SIGINT - Stop after the current post and export what was recorded

EXIT CODES:
    0 - Batch completed (individual posts may still have failed)
    1 - Configuration or runtime error
    2 - Authentication failed
    3 - Invalid input
")]
struct Cli {
    /// Post configuration file (JSON array)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Reddit credentials file (JSON object)
    #[arg(long, value_name = "PATH")]
    credentials: Option<PathBuf>,

    /// Serve the activity dashboard while posting
    #[arg(short, long)]
    dashboard: bool,

    /// Minimum seconds between posts; the wait is drawn from [N, N+30]
    #[arg(long, value_name = "SECONDS")]
    delay: Option<u64>,

    /// Where to write the recorded events
    #[arg(short, long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// Dashboard port
    #[arg(short, long)]
    port: Option<u16>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Settings file values with command-line overrides applied
struct RunSettings {
    config_path: PathBuf,
    credentials_path: PathBuf,
    export_path: PathBuf,
    delay: DelayRange,
    dashboard: DashboardConfig,
}

impl RunSettings {
    fn resolve(cli: &Cli, config: Config) -> Self {
        let posting = config.posting;
        let export_path = cli
            .export
            .clone()
            .unwrap_or_else(|| expand_path(&posting.export_path));

        let delay = match cli.delay {
            Some(floor) => DelayRange::from_floor(floor, DELAY_SPREAD_SECS),
            None => DelayRange::from_floor(posting.delay_floor_secs, posting.delay_spread_secs),
        };

        // The dashboard always watches the file this run exports to
        let mut dashboard = config.dashboard;
        dashboard.events_path = export_path.display().to_string();
        if let Some(port) = cli.port {
            dashboard.port = port;
        }

        Self {
            config_path: cli
                .config
                .clone()
                .unwrap_or_else(|| expand_path(&posting.config_path)),
            credentials_path: cli
                .credentials
                .clone()
                .unwrap_or_else(|| expand_path(&posting.credentials_path)),
            export_path,
            delay,
            dashboard,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::from_env(cli.verbose).init();

    let settings = match Config::load() {
        Ok(config) => RunSettings::resolve(&cli, config),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    if let Err(e) = setup_signal_handlers(Arc::clone(&shutdown)) {
        warn!("{}", e);
    }

    let server = if cli.dashboard {
        start_dashboard(&settings.dashboard).await
    } else {
        None
    };

    let outcome = run(&cli, &settings, shutdown).await;
    if let Err(e) = &outcome {
        eprintln!("Error: {}", e);
    }

    if let Some(server) = server {
        info!(
            "Dashboard still running at http://{}:{}; press Ctrl-C to stop",
            settings.dashboard.address, settings.dashboard.port
        );
        match server.await {
            Ok(Err(e)) => error!("Dashboard stopped: {}", e),
            Err(e) => error!("Dashboard task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    if let Err(e) = outcome {
        std::process::exit(e.exit_code());
    }
}

/// Exit status after a second interrupt, as a shell reports SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, PartialEq, Eq)]
enum SignalAction {
    /// Finish the current post, then stop
    Stop,
    /// Leave now
    Exit,
}

fn on_signal(shutdown: &AtomicBool) -> SignalAction {
    if shutdown.swap(true, Ordering::Relaxed) {
        SignalAction::Exit
    } else {
        SignalAction::Stop
    }
}

/// Set up signal handlers for graceful shutdown
///
/// The first SIGINT/SIGTERM raises `shutdown`. A second one exits
/// immediately with status 130, without writing the events file.
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|e| SubcastError::InvalidInput(format!("Signal setup failed: {}", e)))?;

    std::thread::spawn(move || {
        for _ in signals.forever() {
            match on_signal(&shutdown) {
                SignalAction::Stop => {
                    info!("Received shutdown signal, stopping after the current post...");
                }
                SignalAction::Exit => {
                    warn!("Received second shutdown signal, exiting now");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        }
    });

    Ok(())
}

/// Prime the dashboard and serve it on a background task
///
/// A dashboard that fails to start is logged and the batch runs without it.
async fn start_dashboard(config: &DashboardConfig) -> Option<JoinHandle<Result<()>>> {
    match Dashboard::start(config.clone()).await {
        Ok(dashboard) => Some(tokio::spawn(dashboard.serve())),
        Err(e) => {
            error!("Dashboard could not start: {}", e);
            None
        }
    }
}

async fn run(cli: &Cli, settings: &RunSettings, shutdown: Arc<AtomicBool>) -> Result<()> {
    if write_sample_credentials(&settings.credentials_path)? {
        eprintln!(
            "Created sample {}. Update it with your Reddit API credentials before posting.",
            settings.credentials_path.display()
        );
    }
    if write_sample_post_config(&settings.config_path)? {
        eprintln!(
            "Created sample {}. Update it with your posts.",
            settings.config_path.display()
        );
    }

    let requests = load_post_requests(&settings.config_path)?;
    if requests.is_empty() {
        return Err(SubcastError::InvalidInput(
            "No valid post configuration found".to_string(),
        ));
    }

    let credentials = Credentials::load(&settings.credentials_path)?;
    let mut client = PostingClient::connect(credentials).await?;

    info!(
        "Posting {} request(s) with {} between posts",
        requests.len(),
        settings.delay
    );
    let runner = BatchRunner::new(settings.delay).with_shutdown(Arc::clone(&shutdown));
    let events = runner.run(&mut client, &requests).await;

    if shutdown.load(Ordering::Relaxed) {
        warn!(
            "Batch interrupted after {} of {} post(s)",
            events.len(),
            requests.len()
        );
    }

    client.export_events(&settings.export_path)?;

    match cli.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&events)?),
        _ => print_summary(&events, requests.len()),
    }

    Ok(())
}

fn print_summary(events: &[Event], requested: usize) {
    let succeeded = events.iter().filter(|e| e.is_success()).count();
    println!(
        "Processed {} of {} post(s): {} succeeded, {} failed",
        events.len(),
        requested,
        succeeded,
        events.len() - succeeded
    );

    for event in events {
        if event.is_success() {
            println!(
                "  ok      r/{} \"{}\" {}",
                event.subreddit,
                event.title,
                event.post_url.as_deref().unwrap_or("")
            );
        } else {
            println!(
                "  failed  r/{} \"{}\": {}",
                event.subreddit,
                event.title,
                event.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_signal_stops_second_exits() {
        let shutdown = AtomicBool::new(false);

        assert_eq!(on_signal(&shutdown), SignalAction::Stop);
        assert!(shutdown.load(Ordering::Relaxed));

        assert_eq!(on_signal(&shutdown), SignalAction::Exit);
        assert_eq!(on_signal(&shutdown), SignalAction::Exit);
    }
}
