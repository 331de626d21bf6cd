//! Collects recent entries from RSS/Atom feeds and video channels.
//!
//! - [`feed`] - Fetch, parse, date-normalize and freshness-filter feeds
//! - [`channel`] - Resolve channel ids and keep the tracked channel list
//! - [`config`] - TOML configuration
//! - [`util`] - URL and text hygiene

pub mod channel;
pub mod config;
pub mod feed;
pub mod util;
