//! End-to-end runs of `BatchOrchestrator` against a stub job site.
//!
//! Each test stands up a `wiremock` server that answers the location lookup,
//! the listing search (redirecting to a canonical listing URL), numbered
//! listing pages, and job detail pages.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use jobscan_scraper::{
    BatchOrchestrator, BatchSettings, CancellationToken, ExtractionStage, JobSiteClient,
    PatternCatalog, ScraperError, SearchQuery, Termination, UNRATED,
};

const CANONICAL_PATH: &str = "/Job/new-castle-software-jobs-SRCH_IL.0,10_IC1147401_KO11,19.htm";
const PAGE_TWO_PATH: &str = "/Job/new-castle-software-jobs-SRCH_IL.0,10_IC1147401_KO11,19_IP2.htm";

fn test_client(server: &MockServer) -> JobSiteClient {
    JobSiteClient::new(&server.uri(), 5, "jobscan-test/0.1", 0, 0)
        .expect("failed to build test JobSiteClient")
}

fn query() -> SearchQuery {
    SearchQuery::new(
        "software",
        "new castle",
        Some(NaiveDate::from_ymd_opt(2018, 7, 9).unwrap()),
    )
}

fn logo(id: u32) -> String {
    format!("https://media.glassdoor.com/sqls/{id}/employer-{id}-squarelogo.png")
}

/// Listing page markup: one `<li>` per job, logo (or `defLogo`) before the link.
/// Job `id` is listed at position `10{id}`.
fn listing_html(jobs: &[(u32, bool)]) -> String {
    let positioned: Vec<(u32, u32, bool)> = jobs
        .iter()
        .map(|&(id, has_logo)| (100 + id, id, has_logo))
        .collect();
    listing_html_at(&positioned)
}

/// Like [`listing_html`], with an explicit `pos` for every `(pos, id, has_logo)`.
fn listing_html_at(jobs: &[(u32, u32, bool)]) -> String {
    let mut html = String::from(r#"<html><body><ul class="jlGrid">"#);
    for &(pos, id, has_logo) in jobs {
        html.push_str(r#"<li class="jl"><div class="logoWrap">"#);
        if has_logo {
            html.push_str(&format!(r#"<img src="{}" alt="logo">"#, logo(id)));
        } else {
            html.push_str(r#"<span class="sqLogo tighten smSqLogo defLogo"></span>"#);
        }
        html.push_str(&format!(
            r#"</div><div class="flexbox"><div><a href="/partner/jobListing.htm?pos={pos}&ao=4&jobListingId={id}" rel="nofollow">Job {id}</a></div></div></li>"#
        ));
    }
    html.push_str("</ul></body></html>");
    html
}

/// Job detail markup. `title: None` leaves the title out entirely.
fn job_html(employer: &str, title: Option<&str>, loc: &str, date: &str) -> String {
    let title = title
        .map(|t| format!("'jobTitle':'{t}',"))
        .unwrap_or_default();
    format!(
        r#"<html><head><script>window.gdJobData = {{'employerName':'{employer}',{title}'loc':'{loc}'}};</script></head>
<body><span class="ratingNum">4.1</span><input type="hidden" id="datePosted" value="{date} 09:30:00"></body></html>"#
    )
}

async fn mount_location(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/util/ajax/findLocationsByFullText.htm"))
        .and(query_param("locationSearchString", "new+castle"))
        .and(query_param("allowPostalCodes", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&json!({"locations": [{"id": "1147401", "type": "C"}]})),
        )
        .mount(server)
        .await;
}

/// Search endpoint redirects to the canonical listing URL, which serves `html`.
async fn mount_first_listing(server: &MockServer, html: String) {
    let canonical = format!("{}{CANONICAL_PATH}", server.uri());
    Mock::given(method("GET"))
        .and(path("/Job/jobs.htm"))
        .and(query_param("sc.keyword", "software"))
        .and(query_param("locT", "C"))
        .and(query_param("locId", "1147401"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", canonical.as_str()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(CANONICAL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

async fn mount_page_two(server: &MockServer, html: String) {
    Mock::given(method("GET"))
        .and(path(PAGE_TWO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

async fn mount_job(server: &MockServer, id: u32, body: String, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path("/job-listing/details.htm"))
        .and(query_param("jobListingId", id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_hits)
        .mount(server)
        .await;
}

/// Serves a job page and cancels `token` while doing so, as a Ctrl-C arriving
/// mid-request would.
struct CancellingJobPage {
    token: CancellationToken,
    body: String,
}

impl Respond for CancellingJobPage {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.token.cancel();
        ResponseTemplate::new(200).set_body_string(self.body.clone())
    }
}

fn job_url(server: &MockServer, id: u32) -> String {
    format!(
        "{}/job-listing/details.htm?pos=10{id}&ao=4&jobListingId={id}",
        server.uri()
    )
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_pages_yield_records_and_one_failure() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_first_listing(&server, listing_html(&[(1, true), (2, false)])).await;
    mount_page_two(&server, listing_html(&[(3, true), (4, true)])).await;

    mount_job(&server, 1, job_html("Acme Corp", Some("Software Engineer"), "Newcastle", "2018-07-01"), 1).await;
    mount_job(&server, 2, job_html("Globex", Some("Backend Developer"), "Newcastle", "2018-07-09"), 1).await;
    mount_job(&server, 3, job_html("Initech", None, "Newcastle", "2018-07-05"), 1).await;
    mount_job(&server, 4, job_html("Umbrella &amp; Co", Some("QA Analyst"), "Newcastle", "2018-06-29"), 1).await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let orchestrator = BatchOrchestrator::new(&client, &catalog, BatchSettings::default());
    let outcome = orchestrator
        .run(&query(), 2, &CancellationToken::new())
        .await
        .expect("run should succeed");

    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.pages_processed, 2);
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.jobs_processed(), 4);

    let titles: Vec<&str> = outcome.records.iter().map(|r| r.job_title.as_str()).collect();
    assert_eq!(titles, ["Software Engineer", "Backend Developer", "QA Analyst"]);

    let first = &outcome.records[0];
    assert_eq!(first.company_name, "Acme Corp");
    assert_eq!(first.job_posting_age_days, 8);
    assert_eq!(first.company_logo_url.as_deref(), Some(logo(1).as_str()));
    assert_eq!(first.job_url, job_url(&server, 1));

    assert!(outcome.records[1].company_logo_url.is_none(), "defLogo means no logo");
    assert_eq!(outcome.records[1].job_posting_age_days, 0);
    assert_eq!(outcome.records[2].company_name, "Umbrella & Co");

    let failure = &outcome.failures[0];
    assert_eq!(failure.stage, ExtractionStage::JobTitle);
    assert_eq!(failure.job_url, job_url(&server, 3));
}

#[tokio::test]
async fn single_page_run_never_requests_page_two() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_first_listing(&server, listing_html(&[(1, true)])).await;
    Mock::given(method("GET"))
        .and(path(PAGE_TWO_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_job(&server, 1, job_html("Acme", Some("Dev"), "Newcastle", "2018-07-01"), 1).await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let outcome = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.pages_processed, 1);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].company_rating, 4.1);
}

#[tokio::test]
async fn listing_page_without_job_links_is_not_an_error() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_first_listing(&server, "<html><body>No jobs found</body></html>".to_owned()).await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let outcome = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.pages_processed, 1);
    assert_eq!(outcome.jobs_processed(), 0);
    assert_eq!(outcome.termination, Termination::Completed);
}

// ---------------------------------------------------------------------------
// Per-job failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn job_page_error_status_is_a_fetch_failure() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_first_listing(&server, listing_html(&[(1, true), (2, true)])).await;
    Mock::given(method("GET"))
        .and(path("/job-listing/details.htm"))
        .and(query_param("jobListingId", "1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_job(&server, 2, job_html("Globex", Some("Dev"), "Newcastle", "2018-07-01"), 1).await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let outcome = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].company_name, "Globex");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].stage, ExtractionStage::Fetch);
    assert!(
        outcome.failures[0].cause.contains("404"),
        "cause: {}",
        outcome.failures[0].cause
    );
}

#[tokio::test]
async fn job_link_without_logo_is_alignment_failure_and_not_fetched() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    // Two job links, one logo: the second link has nothing to pair with.
    let html = format!(
        r#"<html><img src="{}"><div><a href="/partner/jobListing.htm?pos=101&ao=4&jobListingId=1">a</a></div><div><a href="/partner/jobListing.htm?pos=102&ao=4&jobListingId=2">b</a></div></html>"#,
        logo(1)
    );
    mount_first_listing(&server, html).await;
    mount_job(&server, 1, job_html("Acme", Some("Dev"), "Newcastle", "2018-07-01"), 1).await;
    mount_job(&server, 2, job_html("Never", Some("Fetched"), "Nowhere", "2018-07-01"), 0).await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let outcome = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].stage, ExtractionStage::LogoAlignment);
    assert!(outcome.failures[0].job_url.ends_with("jobListingId=2"));
}

#[tokio::test]
async fn missing_rating_is_recorded_as_unrated() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_first_listing(&server, listing_html(&[(1, true)])).await;
    let body = r#"<script>{'employerName':'Acme','jobTitle':'Dev','loc':'Newcastle'}</script><input type="hidden" id="datePosted" value="2018-07-02 00:00:00">"#;
    mount_job(&server, 1, body.to_owned(), 1).await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let outcome = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].company_rating, UNRATED);
    assert_eq!(outcome.records[0].job_posting_age_days, 7);
}

#[tokio::test]
async fn job_page_timeout_is_a_fetch_failure_and_run_continues() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_first_listing(&server, listing_html(&[(1, true), (2, true)])).await;
    Mock::given(method("GET"))
        .and(path("/job-listing/details.htm"))
        .and(query_param("jobListingId", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(job_html("Slow", Some("Dev"), "Newcastle", "2018-07-01"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_job(&server, 2, job_html("Globex", Some("Dev"), "Newcastle", "2018-07-01"), 1).await;

    let client = JobSiteClient::new(&server.uri(), 1, "jobscan-test/0.1", 0, 0)
        .expect("failed to build test JobSiteClient");
    let catalog = PatternCatalog::new();
    let outcome = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].company_name, "Globex");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].stage, ExtractionStage::Fetch);
    assert_eq!(outcome.failures[0].job_url, job_url(&server, 1));
}

// ---------------------------------------------------------------------------
// Pacing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn inter_request_delay_separates_job_fetches() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_first_listing(&server, listing_html(&[(1, true), (2, true), (3, true)])).await;
    for id in 1..=3 {
        mount_job(&server, id, job_html("Acme", Some("Dev"), "Newcastle", "2018-07-01"), 1).await;
    }

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let settings = BatchSettings {
        inter_request_delay_ms: 200,
        ..BatchSettings::default()
    };
    let started = Instant::now();
    let outcome = BatchOrchestrator::new(&client, &catalog, settings)
        .run(&query(), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 3);
    // Two pauses: before the second and the third job page.
    assert!(
        started.elapsed() >= Duration::from_millis(400),
        "elapsed: {:?}",
        started.elapsed()
    );
}

// ---------------------------------------------------------------------------
// De-duplication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_posting_is_fetched_once_by_default() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_first_listing(&server, listing_html_at(&[(101, 1, true), (102, 2, true)])).await;
    // Posting 2 again, listed at a different position on page two.
    mount_page_two(&server, listing_html_at(&[(201, 2, true), (202, 3, true)])).await;
    mount_job(&server, 1, job_html("A", Some("One"), "Newcastle", "2018-07-01"), 1).await;
    mount_job(&server, 2, job_html("B", Some("Two"), "Newcastle", "2018-07-01"), 1).await;
    mount_job(&server, 3, job_html("C", Some("Three"), "Newcastle", "2018-07-01"), 1).await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let outcome = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 2, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.duplicates_skipped, 1);
}

#[tokio::test]
async fn repeated_job_url_is_kept_when_dedupe_disabled() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_first_listing(&server, listing_html(&[(1, true)])).await;
    mount_page_two(&server, listing_html(&[(1, true)])).await;
    mount_job(&server, 1, job_html("A", Some("One"), "Newcastle", "2018-07-01"), 2).await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let settings = BatchSettings {
        dedupe_job_urls: false,
        ..BatchSettings::default()
    };
    let outcome = BatchOrchestrator::new(&client, &catalog, settings)
        .run(&query(), 2, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.duplicates_skipped, 0);
}

// ---------------------------------------------------------------------------
// Fatal and aborted runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_location_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/util/ajax/findLocationsByFullText.htm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"locations": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Job/jobs.htm"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let result = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 1, &CancellationToken::new())
        .await;

    assert!(
        matches!(result, Err(ScraperError::NoLocationFound { ref query }) if query == "new castle"),
        "expected NoLocationFound, got: {result:?}"
    );
}

#[tokio::test]
async fn first_listing_page_failure_is_fatal() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    Mock::given(method("GET"))
        .and(path("/Job/jobs.htm"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let result = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 3, &CancellationToken::new())
        .await;

    match result {
        Err(ScraperError::ListingPage { page, source }) => {
            assert_eq!(page, 1);
            assert!(matches!(
                *source,
                ScraperError::UnexpectedStatus { status: 403, .. }
            ));
        }
        other => panic!("expected ListingPage error, got: {other:?}"),
    }
}

#[tokio::test]
async fn later_listing_page_failure_keeps_partial_results() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_first_listing(&server, listing_html(&[(1, true)])).await;
    Mock::given(method("GET"))
        .and(path(PAGE_TWO_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_job(&server, 1, job_html("Acme", Some("Dev"), "Newcastle", "2018-07-01"), 1).await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let outcome = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 3, &CancellationToken::new())
        .await
        .expect("later page failure should not fail the run");

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.pages_processed, 1);
    match outcome.termination {
        Termination::Aborted { page, ref reason } => {
            assert_eq!(page, 2);
            assert!(reason.contains("404"), "reason: {reason}");
        }
        ref other => panic!("expected Aborted, got: {other:?}"),
    }
}

#[tokio::test]
async fn zero_pages_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let result = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 0, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ScraperError::InvalidPageNumber(0))));
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancelled_token_stops_before_first_listing_page() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    Mock::given(method("GET"))
        .and(path("/Job/jobs.htm"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let outcome = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 2, &cancel)
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::Cancelled);
    assert_eq!(outcome.pages_processed, 0);
    assert!(outcome.records.is_empty());
}

#[tokio::test]
async fn cancellation_between_job_links_keeps_gathered_records() {
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_first_listing(&server, listing_html(&[(1, true), (2, true), (3, true)])).await;

    let cancel = CancellationToken::new();
    Mock::given(method("GET"))
        .and(path("/job-listing/details.htm"))
        .and(query_param("jobListingId", "1"))
        .respond_with(CancellingJobPage {
            token: cancel.clone(),
            body: job_html("Acme", Some("Dev"), "Newcastle", "2018-07-01"),
        })
        .expect(1)
        .mount(&server)
        .await;
    for id in 2..=4 {
        mount_job(&server, id, job_html("Never", Some("Fetched"), "Nowhere", "2018-07-01"), 0).await;
    }
    Mock::given(method("GET"))
        .and(path(PAGE_TWO_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let catalog = PatternCatalog::new();
    let outcome = BatchOrchestrator::new(&client, &catalog, BatchSettings::default())
        .run(&query(), 2, &cancel)
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::Cancelled);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].company_name, "Acme");
    assert!(outcome.failures.is_empty());
}
