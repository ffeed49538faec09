use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("no location found for \"{query}\"")]
    NoLocationFound { query: String },

    #[error("listing navigator used before the first listing page was fetched")]
    NavigatorNotInitialized,

    #[error("invalid listing page number {0}: pages start at 1")]
    InvalidPageNumber(u32),

    #[error("cannot derive paged URL from \"{url}\": {reason}")]
    InvalidListingUrl { url: String, reason: String },

    #[error("invalid site base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid pattern override for {name}: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown pattern name \"{0}\"")]
    UnknownPattern(String),

    #[error("listing page {page} could not be fetched: {source}")]
    ListingPage {
        page: u32,
        #[source]
        source: Box<ScraperError>,
    },
}
