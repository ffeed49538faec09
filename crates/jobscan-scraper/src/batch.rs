//! Multi-page scraping run.
//!
//! Drives the pipeline for one [`SearchQuery`]:
//!
//! ```text
//! Init → ResolvingLocation → FetchingPage(1) → ParsingPage(1) → ExtractingJobs(1)
//!      → FetchingPage(2) → … → Done
//! ```
//!
//! Every request is issued sequentially. A job page that cannot be fetched or
//! parsed is recorded as an [`ExtractionFailure`] and the run moves on. The
//! location lookup and the first listing page are fatal: without them there is
//! nothing to report. A later listing page failing ends the run early but keeps
//! everything gathered so far.

use std::collections::HashSet;
use std::time::Duration;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::client::JobSiteClient;
use crate::error::ScraperError;
use crate::extract::fetch_and_extract;
use crate::listing::{
    extract_job_links, extract_logo_links, pair_links, posting_key, PairedLink,
};
use crate::location::resolve_location;
use crate::navigator::ListingNavigator;
use crate::patterns::PatternCatalog;
use crate::types::{
    BatchOutcome, ExtractionFailure, ExtractionStage, JobHeaderRecord, ListingPage, SearchQuery,
    Termination,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Init,
    ResolvingLocation,
    FetchingPage(u32),
    ParsingPage(u32),
    ExtractingJobs(u32),
    Done,
    Fatal,
}

/// Knobs for a batch run that are not part of the query itself.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Pause before every job-page fetch except the first.
    pub inter_request_delay_ms: u64,
    /// Skip postings already handled earlier in the run, matched by
    /// `jobListingId` rather than the full URL.
    pub dedupe_job_urls: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            inter_request_delay_ms: 0,
            dedupe_job_urls: true,
        }
    }
}

/// Results accumulated across listing pages.
#[derive(Default)]
struct Accumulator {
    records: Vec<JobHeaderRecord>,
    failures: Vec<ExtractionFailure>,
    /// Posting keys (see [`posting_key`]) handled so far.
    seen_postings: HashSet<String>,
    duplicates_skipped: usize,
    fetched_any: bool,
}

pub struct BatchOrchestrator<'a> {
    client: &'a JobSiteClient,
    catalog: &'a PatternCatalog,
    settings: BatchSettings,
}

impl<'a> BatchOrchestrator<'a> {
    #[must_use]
    pub fn new(
        client: &'a JobSiteClient,
        catalog: &'a PatternCatalog,
        settings: BatchSettings,
    ) -> Self {
        Self {
            client,
            catalog,
            settings,
        }
    }

    /// Scrapes `page_count` listing pages for `query`.
    ///
    /// Cancellation is checked before each listing page and before each job
    /// link; a cancelled run returns what it has with
    /// [`Termination::Cancelled`].
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidPageNumber`] if `page_count` is 0.
    /// - Location lookup failures ([`ScraperError::NoLocationFound`] or a
    ///   transport error).
    /// - [`ScraperError::ListingPage`] if the first listing page cannot be fetched.
    pub async fn run(
        &self,
        query: &SearchQuery,
        page_count: u32,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, ScraperError> {
        if page_count == 0 {
            return Err(ScraperError::InvalidPageNumber(0));
        }

        let mut state = RunState::Init;
        tracing::info!(
            title = %query.title,
            location = %query.location_text,
            reference_date = %query.reference_date,
            page_count,
            catalog_version = self.catalog.version(),
            "starting scrape run"
        );

        transition(&mut state, RunState::ResolvingLocation);
        let location = match resolve_location(self.client, &query.location_text).await {
            Ok(location) => location,
            Err(e) => {
                transition(&mut state, RunState::Fatal);
                tracing::error!(error = %e, "location resolution failed");
                return Err(e);
            }
        };

        let mut navigator = ListingNavigator::new();
        let mut acc = Accumulator::default();
        let mut pages_processed = 0u32;
        let mut termination = Termination::Completed;

        for page_number in 1..=page_count {
            if cancel.is_cancelled() {
                termination = Termination::Cancelled;
                break;
            }

            transition(&mut state, RunState::FetchingPage(page_number));
            let fetched = if page_number == 1 {
                navigator.first_page(self.client, query, &location).await
            } else {
                navigator.page(self.client, page_number).await
            };
            let page = match fetched {
                Ok(page) => page,
                Err(e) if page_number == 1 => {
                    transition(&mut state, RunState::Fatal);
                    tracing::error!(error = %e, "first listing page could not be fetched");
                    return Err(ScraperError::ListingPage {
                        page: 1,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    transition(&mut state, RunState::Fatal);
                    tracing::error!(
                        page = page_number,
                        error = %e,
                        "listing page could not be fetched, ending run with partial results"
                    );
                    termination = Termination::Aborted {
                        page: page_number,
                        reason: e.to_string(),
                    };
                    break;
                }
            };

            transition(&mut state, RunState::ParsingPage(page_number));
            let links = self.parse_listing(page);

            transition(&mut state, RunState::ExtractingJobs(page_number));
            let finished = self
                .extract_jobs(links, query.reference_date, &mut acc, cancel)
                .await;
            if !finished {
                termination = Termination::Cancelled;
                break;
            }
            pages_processed += 1;
        }

        if state != RunState::Fatal {
            transition(&mut state, RunState::Done);
        }

        let outcome = BatchOutcome {
            records: acc.records,
            failures: acc.failures,
            pages_processed,
            duplicates_skipped: acc.duplicates_skipped,
            termination,
        };
        tracing::info!(
            records = outcome.records.len(),
            failures = outcome.failures.len(),
            duplicates_skipped = outcome.duplicates_skipped,
            pages_processed = outcome.pages_processed,
            termination = ?outcome.termination,
            "scrape run finished"
        );
        Ok(outcome)
    }

    /// Extracts paired job/logo links and drops the page text.
    fn parse_listing(&self, page: ListingPage) -> Vec<PairedLink> {
        let job_links =
            extract_job_links(self.catalog, &self.client.job_detail_base(), &page.raw_text);
        let logos = extract_logo_links(self.catalog, &page.raw_text);
        tracing::info!(
            page = page.page_number,
            url = %page.url,
            job_links = job_links.len(),
            logos = logos.len(),
            "parsed listing page"
        );
        pair_links(job_links, logos)
    }

    /// Processes one page's links. Returns `false` if cancelled part-way.
    async fn extract_jobs(
        &self,
        links: Vec<PairedLink>,
        reference_date: NaiveDate,
        acc: &mut Accumulator,
        cancel: &CancellationToken,
    ) -> bool {
        for (position, link) in links.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return false;
            }

            if self.settings.dedupe_job_urls
                && !acc.seen_postings.insert(posting_key(&link.job_url))
            {
                tracing::debug!(url = %link.job_url, "skipping posting already seen in this run");
                acc.duplicates_skipped += 1;
                continue;
            }

            let Some(logo) = link.logo else {
                let failure = ExtractionFailure::new(
                    &link.job_url,
                    ExtractionStage::LogoAlignment,
                    format!("no logo match at position {position} on the listing page"),
                );
                record_failure(acc, failure);
                continue;
            };

            if acc.fetched_any && self.settings.inter_request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.settings.inter_request_delay_ms))
                    .await;
            }
            acc.fetched_any = true;

            match fetch_and_extract(
                self.client,
                self.catalog,
                &link.job_url,
                logo,
                reference_date,
            )
            .await
            {
                Ok(record) => {
                    tracing::debug!(
                        url = %record.job_url,
                        company = %record.company_name,
                        title = %record.job_title,
                        "extracted job header"
                    );
                    acc.records.push(record);
                }
                Err(failure) => record_failure(acc, failure),
            }
        }
        true
    }
}

fn record_failure(acc: &mut Accumulator, failure: ExtractionFailure) {
    tracing::warn!(
        url = %failure.job_url,
        stage = %failure.stage,
        cause = %failure.cause,
        "could not extract job header"
    );
    acc.failures.push(failure);
}

fn transition(state: &mut RunState, next: RunState) {
    tracing::debug!(from = ?*state, to = ?next, "run state");
    *state = next;
}
