//! Text-extraction patterns for listing and job detail pages.
//!
//! Every field the pipeline extracts is located by one regex over the raw
//! page markup. The site changes several of these at once when it ships new
//! markup, so the catalog carries a single version tag for the whole set.
//!
//! Patterns with a capture group yield group 1; patterns without one (the
//! logo pattern) yield the whole match.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::ScraperError;

/// Markup generation the built-in patterns were written against.
pub const CATALOG_VERSION: &str = "2018-07";

/// Free-text field body: word chars, whitespace, Latin-1 letters, punctuation.
const TEXT: &str = r"[\d\w\sÀ-ÿ.,&()\[\]{};:\\/#!—–\-]+";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatternName {
    JobLink,
    LogoLink,
    JobTitle,
    CompanyRating,
    JobLocation,
    PostingDate,
    EmployerName,
    /// HTML `companyName` marker; only consulted when `EmployerName` finds nothing.
    CompanyNameFallback,
}

impl PatternName {
    pub const ALL: [PatternName; 8] = [
        Self::JobLink,
        Self::LogoLink,
        Self::JobTitle,
        Self::CompanyRating,
        Self::JobLocation,
        Self::PostingDate,
        Self::EmployerName,
        Self::CompanyNameFallback,
    ];

    /// Lowercase key used by configuration overrides.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::JobLink => "job_link",
            Self::LogoLink => "logo_link",
            Self::JobTitle => "job_title",
            Self::CompanyRating => "company_rating",
            Self::JobLocation => "job_location",
            Self::PostingDate => "posting_date",
            Self::EmployerName => "employer_name",
            Self::CompanyNameFallback => "company_name_fallback",
        }
    }

    /// # Errors
    ///
    /// Returns [`ScraperError::UnknownPattern`] when `key` names no pattern.
    pub fn from_key(key: &str) -> Result<Self, ScraperError> {
        Self::ALL
            .into_iter()
            .find(|name| name.key() == key)
            .ok_or_else(|| ScraperError::UnknownPattern(key.to_owned()))
    }

    fn default_source(self) -> String {
        match self {
            Self::JobLink => r#"v><a href=['"]/partner/jobListing([.?=&_0-9a-zA-Z]+)['"]"#.to_owned(),
            Self::LogoLink => {
                r"https?://media\.glassdoor\.[a-zA-Z.-]+/sqls/[0-9]+/[a-zA-Z0-9-]+\.png|defLogo"
                    .to_owned()
            }
            Self::JobTitle => format!(r#"['"]jobTitle['"]:['"]({TEXT})['"]"#),
            Self::CompanyRating => r#"['"]ratingNum['"]>([\d.]+)<"#.to_owned(),
            Self::JobLocation => format!(r#"['"]loc['"]:['"]({TEXT})['"]"#),
            Self::PostingDate => r#"['"]datePosted['"]\svalue=['"]([0-9-]+)\s"#.to_owned(),
            Self::EmployerName => format!(r#"['"]employerName['"]:['"]({TEXT})['"]"#),
            Self::CompanyNameFallback => format!(r#"['"]companyName['"]>({TEXT})<"#),
        }
    }
}

impl std::fmt::Display for PatternName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Immutable set of compiled extraction patterns.
///
/// Built once per run and handed by reference to every component that reads
/// markup.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    version: String,
    patterns: BTreeMap<PatternName, Regex>,
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternCatalog {
    /// Catalog with the built-in patterns.
    ///
    /// # Panics
    ///
    /// Only if a built-in pattern fails to compile, which the unit tests rule out.
    #[must_use]
    pub fn new() -> Self {
        let patterns = PatternName::ALL
            .into_iter()
            .map(|name| {
                let re = Regex::new(&name.default_source()).expect("valid built-in pattern");
                (name, re)
            })
            .collect();
        Self {
            version: CATALOG_VERSION.to_owned(),
            patterns,
        }
    }

    /// Replaces one pattern. The version tag gains a `+custom` suffix so logs
    /// show the catalog no longer matches the built-in set.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidPattern`] if `source` does not compile.
    pub fn with_pattern(mut self, name: PatternName, source: &str) -> Result<Self, ScraperError> {
        let re = Regex::new(source).map_err(|e| ScraperError::InvalidPattern {
            name: name.key().to_owned(),
            source: e,
        })?;
        self.patterns.insert(name, re);
        if !self.version.ends_with("+custom") {
            self.version.push_str("+custom");
        }
        Ok(self)
    }

    /// Applies `(key, source)` overrides as loaded from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UnknownPattern`] or [`ScraperError::InvalidPattern`]
    /// for the first bad entry.
    pub fn with_overrides<'a, I>(self, overrides: I) -> Result<Self, ScraperError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        overrides.into_iter().try_fold(self, |catalog, (key, source)| {
            let name = PatternName::from_key(key)?;
            tracing::info!(pattern = %name, "using configured pattern override");
            catalog.with_pattern(name, source)
        })
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// All matches of `name` in `text`, in source order.
    #[must_use]
    pub fn find_all<'t>(&self, name: PatternName, text: &'t str) -> Vec<&'t str> {
        let re = &self.patterns[&name];
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| m.as_str())
            .collect()
    }

    /// The first match of `name` in `text`, if any.
    #[must_use]
    pub fn find_first<'t>(&self, name: PatternName, text: &'t str) -> Option<&'t str> {
        let caps = self.patterns[&name].captures(text)?;
        caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str())
    }
}
