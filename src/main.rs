use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use skywatch::config::Config;
use skywatch::fetch::SnapshotFetcher;
use skywatch::ledger::MemoryLedger;
use skywatch::snapshot_processor::SnapshotProcessor;

#[derive(Parser)]
#[command(name = "skywatch", about = "Aircraft telemetry takeoff/landing tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the telemetry feed and detect takeoffs and landings
    Run {
        /// Path to the TOML config file (overrides SKYWATCH_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Telemetry feed URL (overrides config and SKYWATCH_API_URL)
        #[arg(long)]
        api_url: Option<String>,
        /// Seconds between snapshot fetches (overrides config)
        #[arg(long)]
        interval: Option<u64>,
        /// Process a single snapshot and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            api_url,
            interval,
            once,
        } => run(config, api_url, interval, once).await,
    }
}

async fn run(
    config_path: Option<PathBuf>,
    api_url: Option<String>,
    interval: Option<u64>,
    once: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => Config::load(&path)?,
        None => Config::load_or_default()?,
    };
    if let Some(url) = api_url {
        config.api_url = url;
    }
    if let Some(secs) = interval {
        config.poll_interval_secs = secs;
    }

    info!(
        "Starting skywatch: {} airports, polling {} every {}s",
        config.airports.len(),
        config.api_url,
        config.poll_interval_secs
    );

    let mut fetcher = SnapshotFetcher::new(
        config.api_url.clone(),
        config.fetch_retries,
        Duration::from_secs(config.fetch_retry_delay_secs),
    );
    let mut processor = SnapshotProcessor::new(
        config.matcher(),
        config.thresholds(),
        MemoryLedger::new(),
    );
    let state_max_age = chrono::Duration::hours(config.state_max_age_hours);

    let mut ticker = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }

        // A failed cycle commits nothing; the next tick starts clean.
        match run_cycle(&mut fetcher, &mut processor).await {
            Ok(()) => {}
            Err(e) => error!("Snapshot cycle failed: {:#}", e),
        }

        let removed = processor.cleanup_stale_states(state_max_age);
        if removed > 0 {
            info!("Cleaned up {} stale aircraft states", removed);
        }

        if once {
            break;
        }
    }

    Ok(())
}

async fn run_cycle(
    fetcher: &mut SnapshotFetcher,
    processor: &mut SnapshotProcessor<MemoryLedger>,
) -> Result<()> {
    let snapshot = fetcher.fetch().await?;
    let outcome = processor.process(&snapshot)?;

    info!(
        "Snapshot {}: {} aircraft, {} flights created, {} extended, {} events",
        outcome.sequence,
        outcome.samples,
        outcome.flights_created.len(),
        outcome.flights_extended.len(),
        outcome.events.len()
    );
    Ok(())
}
