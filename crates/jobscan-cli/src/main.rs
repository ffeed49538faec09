mod scrape;


use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use jobscan_scraper::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "jobscan")]
#[command(about = "Collect job header records from job-site search results")]
struct Cli {
    /// Job title keywords, e.g. "software engineer"
    title: String,

    /// Free-text location, e.g. "new castle"
    location: String,

    /// Number of listing pages to walk
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    batch_size: u32,

    /// Date posting ages are measured against [default: today]
    #[arg(long, value_name = "YYYY-MM-DD")]
    reference_date: Option<NaiveDate>,

    /// Write JSON Lines to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Process a job URL every time it is listed, not just the first time
    #[arg(long)]
    keep_duplicates: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = jobscan_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let request = scrape::ScrapeRequest {
        title: cli.title,
        location: cli.location,
        pages: cli.batch_size,
        reference_date: cli.reference_date,
        output: cli.output,
        keep_duplicates: cli.keep_duplicates,
    };
    scrape::run(&config, &request, &cancel).await
}

/// Cancels `token` on the first Ctrl-C. The run finishes the request in
/// flight, then stops and writes what it has.
async fn cancel_on_ctrl_c(token: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::warn!("received Ctrl-C, stopping after the current request");
            token.cancel();
        }
        Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl-C"),
    }
}
