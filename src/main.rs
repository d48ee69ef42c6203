use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobtrail::config::{Config, LoggingConfig};
use jobtrail::runner;

#[derive(Parser)]
#[command(
    name = "jobtrail",
    version,
    about = "Collect job postings from boards, search APIs and a browser session into an append-only archive",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the `[logging]` section
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Sources file
    #[arg(long, global = true, default_value = "config/sources.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect from every enabled source and reconcile the snapshot
    Run {
        /// Date recorded on collected postings (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Alternative sources file for this run
        #[arg(long)]
        sources: Option<PathBuf>,
    },

    /// Sign in interactively and save the browser session for later runs
    SaveSession {
        /// Where to write the session state (defaults to the configured path)
        #[arg(long)]
        state: Option<PathBuf>,

        /// How long to wait for the sign-in to complete
        #[arg(long, default_value = "300")]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let path = match &cli.command {
        Commands::Run {
            sources: Some(sources),
            ..
        } => sources.clone(),
        _ => cli.config.clone(),
    };
    let config = Config::load(&path)?;

    setup_tracing(&config.logging, cli.log_format.as_deref(), cli.verbose)?;
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Sources file not found, using defaults");
    }

    match cli.command {
        Commands::Run { as_of, .. } => {
            tracing::info!(config = %path.display(), as_of = ?as_of, "Starting run command");

            let outcome = runner::run_once(config, as_of)
                .await
                .context("Run failed")?;

            println!(
                "Snapshot {}: {} new postings, {} rows locally{}",
                outcome.report.snapshot_id,
                outcome.report.collected,
                outcome.report.local_rows,
                outcome
                    .report
                    .archive_rows
                    .map(|rows| format!(", {rows} rows archived"))
                    .unwrap_or_default()
            );
        }

        Commands::SaveSession {
            state,
            timeout_secs,
        } => {
            tracing::info!(state = ?state, timeout_secs, "Starting save-session command");

            let cookies = runner::save_session(
                &config.sources.linkedin_browser,
                state,
                Duration::from_secs(timeout_secs),
            )
            .await
            .context("Saving the session failed")?;

            println!("Saved {cookies} cookies");
        }
    }

    Ok(())
}

fn setup_tracing(logging: &LoggingConfig, format: Option<&str>, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("jobtrail=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("jobtrail={},warn", logging.level))
            .context("Invalid logging.level")?
    };

    match format.unwrap_or(&logging.format) {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
