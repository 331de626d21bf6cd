//! Feed ingestion: fetch, parse, normalize dates, keep what is fresh.
//!
//! This module provides the core pipeline for RSS 2.0 and Atom feeds:
//!
//! - **Parsing**: Read either schema into uniform [`Entry`] values
//! - **Dates**: Reduce RFC 2822 and ISO 8601 dates to one comparable instant
//! - **Filtering**: Keep entries published at or after a [`Cutoff`]
//! - **Aggregation**: Run many sources concurrently with per-source failure isolation
//!
//! # Architecture
//!
//! - [`tree`] - Owned XML tree built with `quick-xml`, plus namespace-prefix removal
//! - [`parser`] - Schema detection and entry extraction
//! - [`dates`] - Date string normalization
//! - [`filter`] - Cutoff computation and the freshness filter
//! - [`fetcher`] - The [`Fetch`] primitive and its HTTP implementation
//! - [`aggregator`] - Fan-out over configured sources
//!
//! # Example
//!
//! ```ignore
//! use freshfeed::feed::{aggregate, AggregateOptions, Cutoff, FeedProfile, HttpFetcher};
//!
//! let fetcher = HttpFetcher::new(reqwest::Client::new());
//! let cutoff = Cutoff::hours_ago(24.0)?;
//! let report = aggregate(&fetcher, &sources, &FeedProfile::syndication(), cutoff,
//!     AggregateOptions::default()).await;
//! ```

pub mod aggregator;
pub mod dates;
pub mod fetcher;
pub mod filter;
pub mod parser;
pub mod tree;
mod types;

pub use aggregator::{
    aggregate, aggregate_until, AggregateOptions, AggregateReport, FeedLocator, FeedProfile,
    SourceError, SourceOutcome, DEFAULT_MAX_CONCURRENT, ID_PLACEHOLDER,
};
pub use dates::{parse_timestamp, DateParseError};
pub use fetcher::{
    Fetch, FetchError, HttpFetcher, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_RESPONSE_BYTES,
};
pub use filter::{filter_fresh, Cutoff, WindowError};
pub use parser::{parse_feed, parse_feed_with, AtomDates};
pub use tree::ParseError;
pub use types::{Entry, Source, SourceKind, UNTITLED};
