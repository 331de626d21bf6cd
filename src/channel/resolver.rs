use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::channel::scrape::{attr_value, find_tags, has_attr, json_string_values};
use crate::feed::{Fetch, FetchError};
use crate::util::validate_url;

/// Name given to channels added without a name and without an `@handle` URL.
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// Errors that end a single identifier resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The provided URL failed validation (SSRF, bad scheme, etc.)
    #[error("invalid channel URL: {0}")]
    InvalidUrl(String),
    /// The landing page could not be fetched
    #[error("failed to fetch channel page: {0}")]
    Fetch(#[from] FetchError),
    /// Every extraction strategy came up empty
    #[error("could not extract channel id")]
    NotFound,
}

/// Where an identifier will come from, decided before any network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionPlan {
    /// The URL path already names the channel (`/channel/<id>`)
    Known(String),
    /// The page at this URL has to be fetched and scraped
    Fetch(String),
}

/// Extraction heuristics, strongest signal first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `<meta itemprop="channelId" content="...">`
    MetaTag,
    /// `"externalId":"..."` inside embedded script data
    ScriptData,
    /// `<link rel="canonical" href=".../channel/<id>">`
    CanonicalLink,
}

impl Strategy {
    /// Priority order; the first strategy to produce an id wins.
    pub const ORDER: [Strategy; 3] = [
        Strategy::MetaTag,
        Strategy::ScriptData,
        Strategy::CanonicalLink,
    ];

    /// First plausible id among every candidate this strategy finds on the page.
    fn extract(self, html: &str, page_url: &str) -> Option<String> {
        let candidates: Vec<String> = match self {
            Strategy::MetaTag => find_tags(html, "meta")
                .into_iter()
                .filter(|tag| has_attr(tag, "itemprop", "channelId"))
                .filter_map(|tag| attr_value(tag, "content"))
                .map(str::to_owned)
                .collect(),
            Strategy::ScriptData => json_string_values(html, "externalId")
                .into_iter()
                .map(str::to_owned)
                .collect(),
            Strategy::CanonicalLink => find_tags(html, "link")
                .into_iter()
                .filter(|tag| has_attr(tag, "rel", "canonical"))
                .filter_map(|tag| attr_value(tag, "href"))
                .filter_map(|href| channel_id_from_href(href, page_url))
                .collect(),
        };

        candidates
            .into_iter()
            .map(|id| id.trim().to_owned())
            .find(|id| is_plausible_id(id))
    }
}

/// Decides whether `url` needs a page fetch, and which page.
///
/// `/channel/<id>` paths resolve immediately. A leading `@handle` segment is
/// reduced to `scheme://host/@handle` so sub-pages (`/@handle/videos`) fetch
/// the channel root. Anything else is fetched as given.
pub fn plan_resolution(url: &Url) -> ResolutionPlan {
    let mut segments = url
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty());

    match (segments.next(), segments.next()) {
        (Some("channel"), Some(id)) if is_plausible_id(id) => {
            ResolutionPlan::Known(id.to_owned())
        }
        (Some(handle), _) if handle.starts_with('@') => {
            let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
            ResolutionPlan::Fetch(format!(
                "{}://{}{}/{}",
                url.scheme(),
                url.host_str().unwrap_or_default(),
                port,
                handle
            ))
        }
        _ => ResolutionPlan::Fetch(url.to_string()),
    }
}

/// Applies every [`Strategy`] in priority order, stopping at the first match.
pub fn extract_channel_id(html: &str, page_url: &str) -> Option<(Strategy, String)> {
    Strategy::ORDER
        .iter()
        .find_map(|strategy| strategy.extract(html, page_url).map(|id| (*strategy, id)))
}

/// Resolves a channel landing-page URL to its stable channel id.
///
/// `timeout` bounds the single page fetch; `/channel/<id>` URLs need none.
///
/// # Errors
///
/// [`ResolveError::InvalidUrl`] for unparseable, non-HTTP(S) or private
/// addresses, [`ResolveError::Fetch`] if the page cannot be retrieved, and
/// [`ResolveError::NotFound`] when no strategy yields an id.
pub async fn resolve_channel_id(
    fetcher: &dyn Fetch,
    url: &str,
    timeout: Duration,
) -> Result<String, ResolveError> {
    // SEC: Validate URL before fetching (SSRF prevention)
    let parsed = validate_url(url.trim()).map_err(|e| ResolveError::InvalidUrl(e.to_string()))?;
    resolve_parsed(fetcher, &parsed, timeout).await
}

/// Core resolution on an already-validated URL.
async fn resolve_parsed(
    fetcher: &dyn Fetch,
    url: &Url,
    timeout: Duration,
) -> Result<String, ResolveError> {
    let target = match plan_resolution(url) {
        ResolutionPlan::Known(id) => {
            tracing::debug!(url = %url, id = %id, "Channel id taken from URL path");
            return Ok(id);
        }
        ResolutionPlan::Fetch(target) => target,
    };

    tracing::debug!(url = %target, "Fetching channel page");
    let bytes = fetcher.fetch(&target, timeout).await?;
    let html = String::from_utf8_lossy(&bytes);

    match extract_channel_id(&html, &target) {
        Some((strategy, id)) => {
            tracing::debug!(strategy = ?strategy, id = %id, "Channel id extracted");
            Ok(id)
        }
        None => {
            tracing::debug!(url = %target, "No extraction strategy matched");
            Err(ResolveError::NotFound)
        }
    }
}

/// Default display name for a channel URL: its `@handle`, if it has one.
pub fn channel_name_from_url(url: &str) -> String {
    Url::parse(url.trim())
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.find(|s| !s.is_empty()))
                .filter(|first| first.starts_with('@'))
                .map(str::to_owned)
        })
        .unwrap_or_else(|| UNKNOWN_CHANNEL.to_owned())
}

fn channel_id_from_href(href: &str, page_url: &str) -> Option<String> {
    let resolved = match Url::parse(href) {
        Ok(url) => url,
        Err(_) => Url::parse(page_url).ok()?.join(href).ok()?,
    };
    let mut segments = resolved.path_segments()?.filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some("channel"), Some(id)) => Some(id.to_owned()),
        _ => None,
    }
}

/// Identifiers are URL-safe tokens; anything else is scraping noise.
fn is_plausible_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
