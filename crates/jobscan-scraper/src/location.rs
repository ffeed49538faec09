//! Free-text location → site location identifiers.
//!
//! The lookup endpoint answers `{"locations": ...}` where `locations` is a
//! single object for unambiguous queries and a list otherwise. Each object
//! carries an `id` (string or number, depending on the location kind) and a
//! one-letter `type`. The first candidate in response order always wins.

use serde::Deserialize;

use crate::client::{JobSiteClient, LOCATION_LOOKUP_PATH};
use crate::error::ScraperError;
use crate::types::{LocationType, ResolvedLocation};

#[derive(Debug, Deserialize)]
struct LocationLookupResponse {
    #[serde(default)]
    locations: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<LocationCandidate>),
    One(LocationCandidate),
}

/// Both fields are optional so a malformed candidate reads as "no location"
/// rather than a body-shape error.
#[derive(Debug, Deserialize)]
struct LocationCandidate {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Resolves `location_text` with one lookup request.
///
/// # Errors
///
/// - [`ScraperError::Http`], [`ScraperError::UnexpectedStatus`],
///   [`ScraperError::RateLimited`]: the lookup request failed.
/// - [`ScraperError::NoLocationFound`]: the response has zero candidates.
/// - [`ScraperError::Deserialize`]: the body is not the expected JSON shape.
pub async fn resolve_location(
    client: &JobSiteClient,
    location_text: &str,
) -> Result<ResolvedLocation, ScraperError> {
    let url = client.endpoint(LOCATION_LOOKUP_PATH)?;
    let search = location_text.replace(' ', "+");
    let page = client
        .get(
            url.as_str(),
            &[
                ("locationSearchString", search.as_str()),
                ("allowPostalCodes", "true"),
            ],
        )
        .await?;

    let resolved = parse_location_response(location_text, &page.body)?;
    tracing::info!(
        location = location_text,
        location_id = %resolved.location_id,
        location_type = resolved.location_type.code(),
        "resolved search location"
    );
    Ok(resolved)
}

/// Picks the first candidate from a lookup response body.
///
/// # Errors
///
/// Returns [`ScraperError::Deserialize`] for malformed bodies and
/// [`ScraperError::NoLocationFound`] when no usable candidate exists.
pub fn parse_location_response(
    location_text: &str,
    body: &str,
) -> Result<ResolvedLocation, ScraperError> {
    let parsed: LocationLookupResponse =
        serde_json::from_str(body).map_err(|e| ScraperError::Deserialize {
            context: format!("location lookup for \"{location_text}\""),
            source: e,
        })?;

    let first = match parsed.locations {
        Some(OneOrMany::Many(list)) => list.into_iter().next(),
        Some(OneOrMany::One(candidate)) => Some(candidate),
        None => None,
    };

    let not_found = || ScraperError::NoLocationFound {
        query: location_text.to_owned(),
    };
    let candidate = first.ok_or_else(not_found)?;

    let location_id = match candidate.id {
        serde_json::Value::String(s) if !s.is_empty() => s,
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            tracing::warn!(id = %other, "location candidate has no usable id");
            return Err(not_found());
        }
    };

    let Some(kind) = candidate.kind.filter(|k| !k.is_empty()) else {
        tracing::warn!(location_id = %location_id, "location candidate has no type");
        return Err(not_found());
    };

    Ok(ResolvedLocation {
        location_id,
        location_type: LocationType::from_code(&kind),
    })
}
