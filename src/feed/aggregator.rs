use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::feed::fetcher::{Fetch, FetchError, DEFAULT_FETCH_TIMEOUT};
use crate::feed::filter::{filter_fresh, Cutoff};
use crate::feed::parser::{parse_feed_with, AtomDates};
use crate::feed::tree::ParseError;
use crate::feed::types::{Entry, Source};

/// Placeholder substituted with a source id in feed URL templates.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Default bound on in-flight fetches.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Why one source contributed no entries.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// How a source's feed URL is derived from its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLocator {
    /// The id is already the feed URL
    Direct,
    /// Substitute the id for `{id}` in the template
    Template(String),
}

/// Platform-specific knowledge needed to turn a [`Source`] into entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedProfile {
    pub locator: FeedLocator,
    pub atom_dates: AtomDates,
}

impl FeedProfile {
    /// Plain RSS/Atom subscriptions.
    pub fn syndication() -> Self {
        Self {
            locator: FeedLocator::Direct,
            atom_dates: AtomDates::UpdatedFirst,
        }
    }

    /// Video-channel update feeds, keyed by channel id.
    pub fn video_channel(template: impl Into<String>) -> Self {
        Self {
            locator: FeedLocator::Template(template.into()),
            atom_dates: AtomDates::PublishedFirst,
        }
    }

    pub fn feed_url(&self, source: &Source) -> String {
        match &self.locator {
            FeedLocator::Direct => source.id.clone(),
            FeedLocator::Template(template) => template.replace(ID_PLACEHOLDER, &source.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Applied to each fetch individually
    pub timeout: Duration,
    /// Upper bound on fetches in flight at once (at least 1)
    pub max_concurrent: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// What happened to one source.
#[derive(Debug)]
pub struct SourceOutcome {
    pub source_name: String,
    pub feed_url: String,
    /// Number of fresh entries contributed, or the error that dropped the source
    pub result: Result<usize, SourceError>,
}

/// Result of one aggregation run.
#[derive(Debug, Default)]
pub struct AggregateReport {
    /// Fresh entries, grouped by source in source list order
    pub entries: Vec<Entry>,
    /// One outcome per completed source, in source list order
    pub outcomes: Vec<SourceOutcome>,
    /// Set when the run was cancelled before every source completed
    pub cancelled: bool,
}

impl AggregateReport {
    pub fn failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }
}

/// Fetches, parses and filters every source, isolating failures per source.
///
/// Sources are processed concurrently (bounded by `options.max_concurrent`).
/// A source that fails to fetch or parse is logged and contributes nothing;
/// the rest are unaffected. No sorting or deduplication happens here.
pub async fn aggregate(
    fetcher: &dyn Fetch,
    sources: &[Source],
    profile: &FeedProfile,
    cutoff: Cutoff,
    options: AggregateOptions,
) -> AggregateReport {
    aggregate_until(
        fetcher,
        sources,
        profile,
        cutoff,
        options,
        std::future::pending::<()>(),
    )
    .await
}

/// Like [`aggregate`], but stops waiting once `cancel` resolves.
///
/// In-flight fetches are dropped; sources that already completed are still
/// reported, in source list order.
pub async fn aggregate_until<C>(
    fetcher: &dyn Fetch,
    sources: &[Source],
    profile: &FeedProfile,
    cutoff: Cutoff,
    options: AggregateOptions,
    cancel: C,
) -> AggregateReport
where
    C: Future<Output = ()>,
{
    if sources.is_empty() {
        return AggregateReport::default();
    }

    let mut pending = stream::iter(sources.iter().enumerate())
        .map(|(index, source)| async move {
            let feed_url = profile.feed_url(source);
            let result = collect_source(fetcher, source, &feed_url, profile, cutoff, options).await;
            (index, feed_url, result)
        })
        .buffer_unordered(options.max_concurrent.max(1));

    let mut slots: Vec<Option<(String, Result<Vec<Entry>, SourceError>)>> =
        sources.iter().map(|_| None).collect();
    let mut cancelled = false;

    tokio::pin!(cancel);
    loop {
        tokio::select! {
            next = pending.next() => match next {
                Some((index, feed_url, result)) => slots[index] = Some((feed_url, result)),
                None => break,
            },
            _ = &mut cancel => {
                cancelled = true;
                break;
            }
        }
    }

    if cancelled {
        let completed = slots.iter().filter(|s| s.is_some()).count();
        tracing::warn!(
            completed = completed,
            total = sources.len(),
            "Aggregation cancelled, returning completed sources only"
        );
    }

    let mut report = AggregateReport {
        cancelled,
        ..AggregateReport::default()
    };

    for (source, slot) in sources.iter().zip(slots) {
        let Some((feed_url, result)) = slot else {
            continue;
        };
        let result = match result {
            Ok(entries) => {
                let count = entries.len();
                report.entries.extend(entries);
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(
                    source = %source.name,
                    url = %feed_url,
                    error = %e,
                    "Source failed, skipping"
                );
                Err(e)
            }
        };
        report.outcomes.push(SourceOutcome {
            source_name: source.name.clone(),
            feed_url,
            result,
        });
    }

    report
}

async fn collect_source(
    fetcher: &dyn Fetch,
    source: &Source,
    feed_url: &str,
    profile: &FeedProfile,
    cutoff: Cutoff,
    options: AggregateOptions,
) -> Result<Vec<Entry>, SourceError> {
    // Bound the fetch here too, so a misbehaving Fetch impl cannot stall the run
    let bytes = tokio::time::timeout(options.timeout, fetcher.fetch(feed_url, options.timeout))
        .await
        .map_err(|_| FetchError::Timeout)??;

    let parsed = parse_feed_with(&bytes, profile.atom_dates)?;
    let total = parsed.len();
    let fresh = filter_fresh(parsed, cutoff);

    tracing::debug!(
        source = %source.name,
        parsed = total,
        fresh = fresh.len(),
        "Source processed"
    );

    Ok(fresh
        .into_iter()
        .map(|entry| entry.with_source_name(&source.name))
        .collect())
}
