use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use crate::feed::dates::parse_timestamp;
use crate::feed::types::Entry;

/// Rejected freshness window.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowError {
    #[error("window must be a finite, non-negative number of hours (got {0})")]
    Invalid(f64),
    #[error("window of {0} hours is too large")]
    TooLarge(f64),
}

/// The instant below which entries are excluded.
///
/// Computed once per run so every source is compared against the same point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cutoff(DateTime<Utc>);

impl Cutoff {
    /// `now - hours`. Fractional hours are honoured to the millisecond; zero is allowed.
    pub fn from_window(now: DateTime<Utc>, hours: f64) -> Result<Self, WindowError> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(WindowError::Invalid(hours));
        }

        let millis = (hours * 3_600_000.0).round();
        if millis > i64::MAX as f64 {
            return Err(WindowError::TooLarge(hours));
        }
        let window =
            TimeDelta::try_milliseconds(millis as i64).ok_or(WindowError::TooLarge(hours))?;
        let instant = now
            .checked_sub_signed(window)
            .ok_or(WindowError::TooLarge(hours))?;

        Ok(Self(instant))
    }

    /// Cutoff relative to the current wall clock.
    pub fn hours_ago(hours: f64) -> Result<Self, WindowError> {
        Self::from_window(Utc::now(), hours)
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Keeps entries published at or after the cutoff.
///
/// Each entry's raw date is normalized and stored in `published_at`.
/// Entries without a date, or with one that cannot be parsed, are dropped;
/// a missing date never counts as fresh.
pub fn filter_fresh(entries: Vec<Entry>, cutoff: Cutoff) -> Vec<Entry> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let published_at = match entry.published_raw.as_deref().map(parse_timestamp) {
                Some(Ok(at)) => at,
                Some(Err(e)) => {
                    tracing::debug!(
                        title = %entry.title,
                        error = %e,
                        "Dropping entry with unparseable date"
                    );
                    return None;
                }
                None => return None,
            };

            if published_at.with_timezone(&Utc) >= cutoff.instant() {
                Some(entry.with_published_at(Some(published_at)))
            } else {
                None
            }
        })
        .collect()
}
