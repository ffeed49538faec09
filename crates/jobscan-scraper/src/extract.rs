//! Header extraction from job detail pages.
//!
//! Fields are pulled in a fixed order: company name (primary pattern, then
//! fallback), rating (optional), title, location, posting date. Rating and
//! logo may fall back to sentinels; every other field is required, and the
//! first missing one turns the whole page into an [`ExtractionFailure`].

use chrono::NaiveDate;
use thiserror::Error;

use crate::client::JobSiteClient;
use crate::patterns::{PatternCatalog, PatternName};
use crate::types::{ExtractionFailure, ExtractionStage, JobHeaderRecord, LogoLink, UNRATED};

/// Date format of the `datePosted` field.
pub const POSTING_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
enum FieldError {
    #[error("pattern {0} found no match")]
    NoMatch(PatternName),

    #[error("neither {primary} nor {fallback} found a match")]
    NoMatchWithFallback {
        primary: PatternName,
        fallback: PatternName,
    },

    #[error("matched an empty value for {0}")]
    Empty(PatternName),

    #[error("posting date \"{raw}\" is not YYYY-MM-DD: {source}")]
    InvalidDate {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Extracts a header record from one job page's markup.
///
/// Pure function of its inputs: `job_url` and `logo` are carried into the
/// record unchanged.
///
/// # Errors
///
/// Returns an [`ExtractionFailure`] naming the first required field that
/// could not be extracted.
pub fn extract_header(
    catalog: &PatternCatalog,
    page_text: &str,
    reference_date: NaiveDate,
    job_url: &str,
    logo: LogoLink,
) -> Result<JobHeaderRecord, ExtractionFailure> {
    let fail = |stage: ExtractionStage| {
        move |err: FieldError| ExtractionFailure::new(job_url, stage, err.to_string())
    };

    let company_name =
        company_name(catalog, page_text).map_err(fail(ExtractionStage::CompanyName))?;
    let company_rating = company_rating(catalog, page_text);
    let job_title = required_text(catalog, PatternName::JobTitle, page_text)
        .map_err(fail(ExtractionStage::JobTitle))?;
    let job_location = required_text(catalog, PatternName::JobLocation, page_text)
        .map_err(fail(ExtractionStage::JobLocation))?;
    let posted = posting_date(catalog, page_text).map_err(fail(ExtractionStage::PostingDate))?;

    Ok(JobHeaderRecord {
        company_name,
        company_rating,
        job_title,
        job_location,
        job_posting_age_days: (reference_date - posted).num_days(),
        company_logo_url: logo.into_url(),
        job_url: job_url.to_owned(),
    })
}

/// Fetches `job_url` once and extracts its header record.
///
/// # Errors
///
/// A failed fetch (transport error, non-2xx status, timeout) becomes an
/// [`ExtractionFailure`] with stage [`ExtractionStage::Fetch`]; field
/// failures are reported as by [`extract_header`].
pub async fn fetch_and_extract(
    client: &JobSiteClient,
    catalog: &PatternCatalog,
    job_url: &str,
    logo: LogoLink,
    reference_date: NaiveDate,
) -> Result<JobHeaderRecord, ExtractionFailure> {
    let page = client
        .get(job_url, &[])
        .await
        .map_err(|e| ExtractionFailure::new(job_url, ExtractionStage::Fetch, e.to_string()))?;
    extract_header(catalog, &page.body, reference_date, job_url, logo)
}

fn company_name(catalog: &PatternCatalog, text: &str) -> Result<String, FieldError> {
    // The fallback is tried only when the primary yields nothing usable;
    // values from the two patterns are never combined.
    let mut first_empty = None;
    for name in [PatternName::EmployerName, PatternName::CompanyNameFallback] {
        let Some(raw) = catalog.find_first(name, text) else {
            continue;
        };
        match non_empty(name, raw) {
            Ok(value) => return Ok(value),
            Err(err) => {
                first_empty.get_or_insert(err);
            }
        }
    }
    Err(first_empty.unwrap_or(FieldError::NoMatchWithFallback {
        primary: PatternName::EmployerName,
        fallback: PatternName::CompanyNameFallback,
    }))
}

fn company_rating(catalog: &PatternCatalog, text: &str) -> f64 {
    let Some(raw) = catalog.find_first(PatternName::CompanyRating, text) else {
        return UNRATED;
    };
    raw.parse::<f64>().unwrap_or_else(|_| {
        tracing::debug!(raw, "unparseable rating, recording as unrated");
        UNRATED
    })
}

fn required_text(
    catalog: &PatternCatalog,
    name: PatternName,
    text: &str,
) -> Result<String, FieldError> {
    let raw = catalog
        .find_first(name, text)
        .ok_or(FieldError::NoMatch(name))?;
    non_empty(name, raw)
}

fn posting_date(catalog: &PatternCatalog, text: &str) -> Result<NaiveDate, FieldError> {
    let raw = catalog
        .find_first(PatternName::PostingDate, text)
        .ok_or(FieldError::NoMatch(PatternName::PostingDate))?;
    NaiveDate::parse_from_str(raw, POSTING_DATE_FORMAT).map_err(|source| {
        FieldError::InvalidDate {
            raw: raw.to_owned(),
            source,
        }
    })
}

fn non_empty(name: PatternName, raw: &str) -> Result<String, FieldError> {
    let value = decode_html(raw);
    if value.is_empty() {
        Err(FieldError::Empty(name))
    } else {
        Ok(value)
    }
}

/// Undoes the entity and JSON escaping the site applies to text fields.
fn decode_html(value: &str) -> String {
    value
        .replace("\\/", "/")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
