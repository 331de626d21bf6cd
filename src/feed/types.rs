use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Placeholder title for items whose `title` element is missing or empty.
pub const UNTITLED: &str = "No Title";

/// A configured feed origin.
///
/// `id` is the token the feed URL is built from: for plain syndication feeds
/// it is the feed URL itself, for video channels it is the platform channel id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Display label (not unique)
    pub name: String,
    /// Stable platform token used to construct the feed URL
    pub id: String,
    /// Canonical page URL, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Source {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Which syndication schema an entry was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "RSS")]
    Rss,
    #[serde(rename = "Atom")]
    Atom,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Rss => f.write_str("RSS"),
            SourceKind::Atom => f.write_str("Atom"),
        }
    }
}

/// A normalized feed item.
///
/// The parser fills in everything except `published_at` and `source_name`;
/// the freshness filter sets `published_at` and the aggregator sets
/// `source_name`. Both steps consume the entry and hand back a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    pub title: String,
    /// Empty when the item carried no link
    pub link: String,
    pub published_raw: Option<String>,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub source_kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

impl Entry {
    pub(crate) fn with_published_at(mut self, at: Option<DateTime<FixedOffset>>) -> Self {
        self.published_at = at;
        self
    }

    pub(crate) fn with_source_name(mut self, name: &str) -> Self {
        self.source_name = Some(name.to_owned());
        self
    }
}
