//! Job and logo link extraction from listing pages.
//!
//! Logos carry no reference to the posting they belong to; the Nth logo
//! match on a page belongs to the Nth job link. Both extractors therefore
//! return matches strictly in source order, and [`pair_links`] zips them by
//! index.

use reqwest::Url;

use crate::patterns::{PatternCatalog, PatternName};
use crate::types::LogoLink;

/// Marker the site renders in place of a logo URL.
const NO_LOGO_MARKER: &str = "defLogo";

/// Query parameter identifying a posting independent of where it was listed.
const LISTING_ID_PARAM: &str = "jobListingId";

/// A job link with the logo at the same position, if the page had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedLink {
    pub job_url: String,
    /// `None` when the page yielded fewer logo matches than job links.
    pub logo: Option<LogoLink>,
}

/// Absolute job detail URLs in page order.
///
/// Each raw match is appended to `job_detail_base`.
#[must_use]
pub fn extract_job_links(
    catalog: &PatternCatalog,
    job_detail_base: &str,
    page_text: &str,
) -> Vec<String> {
    catalog
        .find_all(PatternName::JobLink, page_text)
        .into_iter()
        .map(|suffix| format!("{job_detail_base}{suffix}"))
        .collect()
}

/// Logo links in page order; `defLogo` becomes [`LogoLink::Missing`].
#[must_use]
pub fn extract_logo_links(catalog: &PatternCatalog, page_text: &str) -> Vec<LogoLink> {
    catalog
        .find_all(PatternName::LogoLink, page_text)
        .into_iter()
        .map(|raw| {
            if raw == NO_LOGO_MARKER {
                LogoLink::Missing
            } else {
                LogoLink::Url(raw.to_owned())
            }
        })
        .collect()
}

/// Identity of the posting behind `job_url`.
///
/// Job links carry per-listing parameters (`pos`, `guid`, `cb`, ...) that
/// differ each time the same posting is listed, so the `jobListingId` value
/// is the key. URLs without one are keyed by the full URL.
#[must_use]
pub fn posting_key(job_url: &str) -> String {
    Url::parse(job_url)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(name, value)| name == LISTING_ID_PARAM && !value.is_empty())
                .map(|(_, value)| value.into_owned())
        })
        .map_or_else(|| job_url.to_owned(), |id| format!("{LISTING_ID_PARAM}={id}"))
}

/// Zips job links with logos by position.
///
/// Job links past the end of `logos` come back with `logo: None` so the
/// caller can record them as alignment failures. Surplus logos are dropped.
#[must_use]
pub fn pair_links(job_links: Vec<String>, logos: Vec<LogoLink>) -> Vec<PairedLink> {
    if logos.len() > job_links.len() {
        tracing::warn!(
            job_links = job_links.len(),
            logos = logos.len(),
            "listing page has more logos than job links; ignoring the surplus"
        );
    }
    let mut logos = logos.into_iter();
    job_links
        .into_iter()
        .map(|job_url| PairedLink {
            job_url,
            logo: logos.next(),
        })
        .collect()
}
