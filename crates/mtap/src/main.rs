use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mtap::JobOutcome;
use mtap_models::{MtapConfig, SessionId};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "mtap",
    about = "Market Trend Analysis Pipeline - scrapes news and market data, enriches it, and renders a daily report"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/mtap.toml")]
    config: String,

    /// Session id (YYYY-MM-DD). Defaults to today (UTC). Set explicitly to
    /// retry a prior day.
    #[arg(short, long)]
    session: Option<String>,

    /// Override the configured job timeout.
    #[arg(long)]
    timeout_seconds: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: MtapConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse config")?;

    let session_id = match &cli.session {
        Some(raw) => SessionId::parse(raw)
            .with_context(|| format!("Invalid --session value: {raw}"))?,
        None => SessionId::today(),
    };
    let timeout =
        Duration::from_secs(cli.timeout_seconds.unwrap_or(config.job.timeout_seconds));

    let bus = mtap::build_pipeline(&config).context("Failed to build pipeline")?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal");
            cancel.cancel();
        });
    }

    tracing::info!(session = %session_id, "Starting daily job");
    match mtap::run_daily_job(&bus, session_id, timeout, cancel).await {
        JobOutcome::Completed { report_path } => {
            tracing::info!(session = %session_id, report = %report_path, "Daily job completed");
            println!("{report_path}");
        }
        JobOutcome::TimedOut => {
            tracing::warn!(
                session = %session_id,
                "Daily job did not complete before the timeout"
            );
        }
        JobOutcome::Cancelled => {
            tracing::info!(session = %session_id, "Daily job cancelled");
        }
    }

    Ok(())
}
