pub mod batch;
pub mod client;
pub mod error;
pub mod extract;
pub mod listing;
pub mod location;
pub mod navigator;
pub mod patterns;
mod rate_limit;
pub mod sink;
pub mod types;

pub use batch::{BatchOrchestrator, BatchSettings};
pub use client::{FetchedPage, JobSiteClient};
pub use error::ScraperError;
pub use extract::{extract_header, fetch_and_extract};
pub use listing::{
    extract_job_links, extract_logo_links, pair_links, posting_key, PairedLink,
};
pub use location::{parse_location_response, resolve_location};
pub use navigator::{listing_page_url, ListingNavigator};
pub use patterns::{PatternCatalog, PatternName, CATALOG_VERSION};
pub use sink::{JsonLinesSink, ResultSink, SinkError};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    BatchOutcome, ExtractionFailure, ExtractionStage, JobHeaderRecord, ListingPage, LocationType,
    LogoLink, ResolvedLocation, SearchQuery, Termination, UNRATED,
};
