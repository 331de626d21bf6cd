//! Publication date normalization.
//!
//! Two encodings are accepted, tried in order:
//!
//! 1. RFC 2822 (`Mon, 02 Jan 2006 15:04:05 -0700`), the RSS `pubDate` format
//! 2. ISO 8601 / RFC 3339 with an explicit offset, where a trailing `Z` means `+00:00`
//!
//! Nothing else is guessed at. Every result carries an offset; strings
//! without zone information are rejected rather than read as local time.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// ISO 8601 shapes accepted after RFC 3339 proper has failed.
/// `%z` accepts the offset with or without a colon.
const ISO_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("empty date string")]
    Empty,
    #[error("unrecognized date format: {0:?}")]
    Unrecognized(String),
}

/// Parses a feed date string into a timezone-aware instant.
///
/// # Errors
///
/// [`DateParseError::Empty`] for blank input, [`DateParseError::Unrecognized`]
/// when neither RFC 2822 nor ISO 8601 matches.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, DateParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DateParseError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Ok(dt);
    }

    parse_iso8601(raw).ok_or_else(|| DateParseError::Unrecognized(raw.to_owned()))
}

fn parse_iso8601(raw: &str) -> Option<DateTime<FixedOffset>> {
    let normalized: Cow<'_, str> = match raw.strip_suffix(['Z', 'z']) {
        Some(head) => Cow::Owned(format!("{head}+00:00")),
        None => Cow::Borrowed(raw),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt);
    }

    ISO_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&normalized, format).ok())
}
