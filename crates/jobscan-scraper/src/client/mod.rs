//! HTTP transport for the job site.

mod origin;

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;

/// Location lookup endpoint, relative to the site base.
pub(crate) const LOCATION_LOOKUP_PATH: &str = "util/ajax/findLocationsByFullText.htm";
/// Listing search endpoint; the site redirects it to a canonical listing URL.
pub(crate) const LISTING_SEARCH_PATH: &str = "Job/jobs.htm";
/// Job detail base; matched link suffixes (`.htm?pos=...`) are appended verbatim.
pub(crate) const JOB_DETAIL_PATH: &str = "job-listing/details";

/// A successful GET response after redirects.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    /// URL of the last hop in the redirect chain.
    pub final_url: String,
    pub body: String,
}

/// GET-only client for the job site.
///
/// Follows redirects (reqwest's default policy, up to 10 hops) and reports the
/// post-redirect URL. Non-2xx responses are typed errors. Transient failures
/// (429, 5xx, timeouts, connection errors) are retried with exponential
/// backoff up to `max_retries` additional attempts.
pub struct JobSiteClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl JobSiteClient {
    /// Creates a client with a per-request timeout, `User-Agent`, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] if `base_url` is not an absolute
    /// http(s) URL, or [`ScraperError::Http`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ScraperError> {
        let base_url = origin::normalize_base_url(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Absolute URL for a site-relative endpoint path.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] if the join fails.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ScraperError> {
        self.base_url
            .join(path)
            .map_err(|e| ScraperError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: format!("cannot join \"{path}\": {e}"),
            })
    }

    /// Prefix every extracted job link is appended to.
    #[must_use]
    pub fn job_detail_base(&self) -> String {
        format!("{}{JOB_DETAIL_PATH}", self.base_url)
    }

    /// Issues a GET for `url` with extra `query` pairs appended.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`]: HTTP 429 after all retries.
    /// - [`ScraperError::UnexpectedStatus`]: any other non-2xx status
    ///   (5xx retried, 4xx not).
    /// - [`ScraperError::Http`]: network failure or timeout after all retries.
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<FetchedPage, ScraperError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let mut request = self
                .client
                .get(url)
                .header(
                    reqwest::header::ACCEPT,
                    "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
                )
                .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9");
            if !query.is_empty() {
                request = request.query(query);
            }

            let response = request.send().await?;
            let status = response.status();
            let final_url = response.url().to_string();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(ScraperError::RateLimited {
                    domain: origin::extract_domain(&final_url),
                    retry_after_secs,
                });
            }

            if !status.is_success() {
                return Err(ScraperError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: final_url,
                });
            }

            let body = response.text().await?;
            tracing::debug!(url = %final_url, status = status.as_u16(), bytes = body.len(), "fetched page");
            Ok(FetchedPage {
                status: status.as_u16(),
                final_url,
                body,
            })
        })
        .await
    }
}
