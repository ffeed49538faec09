//! Listing page navigation.
//!
//! The search form submits to `Job/jobs.htm`, which redirects to a canonical
//! listing URL such as:
//!
//! ```text
//! https://www.glassdoor.co.in/Job/new-castle-software-jobs-SRCH_IL.0,10_IC2875227_KO11,19.htm
//! ```
//!
//! Page `n` of the same search lives at the canonical URL with `_IP{n}`
//! inserted before the file extension of the last path segment:
//!
//! ```text
//! https://www.glassdoor.co.in/Job/new-castle-software-jobs-SRCH_IL.0,10_IC2875227_KO11,19_IP3.htm
//! ```
//!
//! The rule assumes the canonical URL's last segment has a file extension.
//! URLs violating that are rejected with [`ScraperError::InvalidListingUrl`].

use reqwest::Url;

use crate::client::{JobSiteClient, LISTING_SEARCH_PATH};
use crate::error::ScraperError;
use crate::types::{ListingPage, ResolvedLocation, SearchQuery};

/// Suffix the splice fallback expects when the canonical URL cannot be parsed.
const SPLICE_SUFFIX: &str = ".htm";

/// Tracks the canonical listing URL of one search.
#[derive(Debug, Default)]
pub struct ListingNavigator {
    canonical_url: Option<String>,
}

impl ListingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The post-redirect URL of the first listing page, once fetched.
    #[must_use]
    pub fn canonical_url(&self) -> Option<&str> {
        self.canonical_url.as_deref()
    }

    /// Submits the listing search and records the redirected URL as the
    /// canonical base for later pages.
    ///
    /// # Errors
    ///
    /// Propagates transport errors from [`JobSiteClient::get`].
    pub async fn first_page(
        &mut self,
        client: &JobSiteClient,
        query: &SearchQuery,
        location: &ResolvedLocation,
    ) -> Result<ListingPage, ScraperError> {
        let url = client.endpoint(LISTING_SEARCH_PATH)?;
        let keyword = query.title.replace(' ', "+");
        let params = [
            ("suggestCount", "0"),
            ("suggestChosen", "false"),
            ("clickSource", "searchBtn"),
            ("typedKeyword", keyword.as_str()),
            ("sc.keyword", keyword.as_str()),
            ("locT", location.location_type.code()),
            ("locId", location.location_id.as_str()),
        ];

        let page = client.get(url.as_str(), &params).await?;
        tracing::info!(canonical_url = %page.final_url, "captured canonical listing URL");
        self.canonical_url = Some(page.final_url.clone());

        Ok(ListingPage {
            page_number: 1,
            url: page.final_url,
            raw_text: page.body,
        })
    }

    /// URL of listing page `page_number` for the captured search.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::NavigatorNotInitialized`] before
    /// [`Self::first_page`] succeeded, otherwise any error from
    /// [`listing_page_url`].
    pub fn page_url(&self, page_number: u32) -> Result<String, ScraperError> {
        let canonical = self
            .canonical_url
            .as_deref()
            .ok_or(ScraperError::NavigatorNotInitialized)?;
        listing_page_url(canonical, page_number)
    }

    /// Fetches listing page `page_number`.
    ///
    /// # Errors
    ///
    /// See [`Self::page_url`]; also propagates transport errors.
    pub async fn page(
        &self,
        client: &JobSiteClient,
        page_number: u32,
    ) -> Result<ListingPage, ScraperError> {
        let url = self.page_url(page_number)?;
        let page = client.get(&url, &[]).await?;
        Ok(ListingPage {
            page_number,
            url: page.final_url,
            raw_text: page.body,
        })
    }
}

/// Derives the URL of listing page `page_number` from the canonical URL.
///
/// Page 1 is the canonical URL itself. For later pages the URL is parsed and
/// `_IP{n}` is inserted before the extension of the last path segment, with
/// query and fragment left untouched. Unparseable URLs fall back to a plain
/// string splice before a trailing `.htm`.
///
/// # Errors
///
/// - [`ScraperError::InvalidPageNumber`] for page 0.
/// - [`ScraperError::InvalidListingUrl`] when the last path segment has no
///   extension (or, on the fallback path, the string does not end in `.htm`).
pub fn listing_page_url(canonical: &str, page_number: u32) -> Result<String, ScraperError> {
    if page_number == 0 {
        return Err(ScraperError::InvalidPageNumber(0));
    }
    if page_number == 1 {
        return Ok(canonical.to_owned());
    }

    let invalid = |reason: &str| ScraperError::InvalidListingUrl {
        url: canonical.to_owned(),
        reason: reason.to_owned(),
    };

    let Ok(mut url) = Url::parse(canonical) else {
        tracing::warn!(
            canonical,
            "canonical listing URL is not parseable, falling back to suffix splice"
        );
        let stem = canonical
            .strip_suffix(SPLICE_SUFFIX)
            .ok_or_else(|| invalid("URL does not end in .htm"))?;
        return Ok(format!("{stem}_IP{page_number}{SPLICE_SUFFIX}"));
    };

    let path = url.path().to_owned();
    let (dir, segment) = path.rsplit_once('/').unwrap_or(("", path.as_str()));
    let (stem, extension) = segment
        .rsplit_once('.')
        .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
        .ok_or_else(|| invalid("last path segment has no file extension"))?;

    url.set_path(&format!("{dir}/{stem}_IP{page_number}.{extension}"));
    Ok(url.to_string())
}
