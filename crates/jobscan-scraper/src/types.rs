//! Domain types shared by the listing/extraction pipeline.
//!
//! ## Observed site conventions
//!
//! ### Location types
//! The location lookup answers with single-letter codes: `C` (city), `S`
//! (state), `N` (country) and `M` (metro area). Anything else is kept verbatim
//! so it can still be echoed back as the `locT` search parameter.
//!
//! ### Logos
//! Employers without a logo render the literal token `defLogo` where the
//! image URL would otherwise be. That token is the "no logo" marker.
//!
//! ### Ratings
//! Unrated employers simply omit the rating element. Records carry
//! [`UNRATED`] (`-1`) for them instead of failing.

use chrono::NaiveDate;
use serde::Serialize;

/// Rating value recorded for employers with no rating on their job page.
pub const UNRATED: f64 = -1.0;

/// Immutable inputs for one scraping run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: String,
    pub location_text: String,
    /// Anchor for posting-age computation.
    pub reference_date: NaiveDate,
}

impl SearchQuery {
    /// Builds a query, defaulting the reference date to today's local date.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        location_text: impl Into<String>,
        reference_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            title: title.into(),
            location_text: location_text.into(),
            reference_date: reference_date.unwrap_or_else(|| chrono::Local::now().date_naive()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationType {
    City,
    State,
    Country,
    Metro,
    Other(String),
}

impl LocationType {
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "C" => Self::City,
            "S" => Self::State,
            "N" => Self::Country,
            "M" => Self::Metro,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The code sent back to the site as the `locT` parameter.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::City => "C",
            Self::State => "S",
            Self::Country => "N",
            Self::Metro => "M",
            Self::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub location_id: String,
    pub location_type: LocationType,
}

/// One fetched listing page. Dropped once its links have been extracted.
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub page_number: u32,
    pub url: String,
    pub raw_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoLink {
    Url(String),
    Missing,
}

impl LogoLink {
    #[must_use]
    pub fn into_url(self) -> Option<String> {
        match self {
            Self::Url(url) => Some(url),
            Self::Missing => None,
        }
    }
}

/// Header fields extracted from one job detail page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHeaderRecord {
    pub company_name: String,
    /// Numeric rating, or [`UNRATED`].
    pub company_rating: f64,
    pub job_title: String,
    pub job_location: String,
    /// Reference date minus posting date; negative for future-dated posts.
    pub job_posting_age_days: i64,
    #[serde(rename = "companyLogoURL")]
    pub company_logo_url: Option<String>,
    #[serde(rename = "jobURL")]
    pub job_url: String,
}

/// Pipeline step at which a single job posting was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Fetch,
    LogoAlignment,
    CompanyName,
    JobTitle,
    JobLocation,
    PostingDate,
}

impl std::fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::LogoAlignment => "logo_alignment",
            Self::CompanyName => "company_name",
            Self::JobTitle => "job_title",
            Self::JobLocation => "job_location",
            Self::PostingDate => "posting_date",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionFailure {
    pub job_url: String,
    pub stage: ExtractionStage,
    pub cause: String,
}

impl ExtractionFailure {
    #[must_use]
    pub fn new(job_url: &str, stage: ExtractionStage, cause: impl Into<String>) -> Self {
        Self {
            job_url: job_url.to_owned(),
            stage,
            cause: cause.into(),
        }
    }
}

/// How a batch run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Every requested listing page was processed.
    Completed,
    /// The cancellation token fired; results gathered so far are kept.
    Cancelled,
    /// A listing page after the first could not be fetched.
    Aborted { page: u32, reason: String },
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub records: Vec<JobHeaderRecord>,
    pub failures: Vec<ExtractionFailure>,
    pub pages_processed: u32,
    /// Job links skipped because their URL was already handled earlier in the run.
    pub duplicates_skipped: usize,
    pub termination: Termination,
}

impl BatchOutcome {
    /// Job links that reached either a record or a failure.
    #[must_use]
    pub fn jobs_processed(&self) -> usize {
        self.records.len() + self.failures.len()
    }
}
