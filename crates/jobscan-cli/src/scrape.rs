//! The scrape command: config → client → batch run → sink → summary.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use jobscan_core::AppConfig;
use jobscan_scraper::sink::write_all;
use jobscan_scraper::{
    BatchOrchestrator, BatchOutcome, BatchSettings, CancellationToken, JobSiteClient,
    JsonLinesSink, PatternCatalog, SearchQuery, Termination,
};

/// Arguments for one run, as parsed from the command line.
#[derive(Debug)]
pub(crate) struct ScrapeRequest {
    pub title: String,
    pub location: String,
    pub pages: u32,
    pub reference_date: Option<NaiveDate>,
    pub output: Option<PathBuf>,
    pub keep_duplicates: bool,
}

pub(crate) async fn run(
    config: &AppConfig,
    request: &ScrapeRequest,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!(
        env = %config.env,
        site = %config.site_base_url,
        pages = request.pages,
        "starting jobscan"
    );
    let catalog = PatternCatalog::new()
        .with_overrides(
            config
                .pattern_overrides
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )
        .context("invalid pattern override in configuration")?;

    let client = JobSiteClient::new(
        &config.site_base_url,
        config.request_timeout_secs,
        &config.user_agent,
        config.max_retries,
        config.retry_backoff_base_ms,
    )
    .context("failed to build job-site client")?;

    let settings = batch_settings(config, request.keep_duplicates);
    let query = SearchQuery::new(
        request.title.as_str(),
        request.location.as_str(),
        request.reference_date,
    );

    let outcome = BatchOrchestrator::new(&client, &catalog, settings)
        .run(&query, request.pages, cancel)
        .await
        .with_context(|| {
            format!(
                "scrape of \"{}\" in \"{}\" failed",
                request.title, request.location
            )
        })?;

    write_records(request.output.as_ref(), &outcome)?;
    eprintln!("{}", summary_line(&outcome));

    if let Termination::Aborted { page, reason } = &outcome.termination {
        anyhow::bail!("run aborted at listing page {page}: {reason}");
    }
    Ok(())
}

fn batch_settings(config: &AppConfig, keep_duplicates: bool) -> BatchSettings {
    BatchSettings {
        inter_request_delay_ms: config.inter_request_delay_ms,
        dedupe_job_urls: config.dedupe_job_urls && !keep_duplicates,
    }
}

fn write_records(output: Option<&PathBuf>, outcome: &BatchOutcome) -> anyhow::Result<()> {
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output file {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    };

    let mut sink = JsonLinesSink::new(writer);
    write_all(&mut sink, &outcome.records).context("failed to write records")?;
    tracing::info!(written = sink.written(), "records written");
    Ok(())
}

fn summary_line(outcome: &BatchOutcome) -> String {
    let termination = match &outcome.termination {
        Termination::Completed => "completed".to_owned(),
        Termination::Cancelled => "cancelled".to_owned(),
        Termination::Aborted { page, .. } => format!("aborted at page {page}"),
    };
    format!(
        "{} records, {} failures, {} duplicates skipped across {} pages ({termination})",
        outcome.records.len(),
        outcome.failures.len(),
        outcome.duplicates_skipped,
        outcome.pages_processed,
    )
}
