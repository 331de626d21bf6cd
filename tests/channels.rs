//! Integration tests for tracking a channel: resolve its id, persist it,
//! then aggregate its feed.
//!
//! Network access goes through an in-memory `Fetch` so public channel URLs
//! can be used without leaving the machine.

use async_trait::async_trait;
use chrono::{Duration as TimeDelta, Utc};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use freshfeed::channel::{
    channel_name_from_url, resolve_channel_id, ChannelList, ResolveError, UNKNOWN_CHANNEL,
};
use freshfeed::feed::{
    aggregate, AggregateOptions, Cutoff, FeedProfile, Fetch, FetchError, Source,
    DEFAULT_FETCH_TIMEOUT,
};

/// Serves canned bodies by URL and records every request.
#[derive(Default)]
struct MemoryFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for MemoryFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .map(|body| body.clone().into_bytes())
            .ok_or(FetchError::HttpStatus(404))
    }
}

const HANDLE_URL: &str = "https://www.youtube.com/@rustconf";
const CHANNEL_ID: &str = "UCaYhcUwRBNscFNUKTjgPFiA";

fn landing_page() -> String {
    format!(
        r#"<!DOCTYPE html><html><head>
<link rel="canonical" href="https://www.youtube.com/channel/{CHANNEL_ID}">
<script>var ytInitialData = {{"metadata":{{"externalId":"{CHANNEL_ID}"}}}};</script>
</head><body></body></html>"#
    )
}

fn channel_feed() -> String {
    let published = (Utc::now() - TimeDelta::hours(5)).to_rfc3339();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <yt:videoId>vid001</yt:videoId>
    <title>Keynote</title>
    <published>{published}</published>
  </entry>
</feed>"#
    )
}

#[tokio::test]
async fn test_add_channel_then_fetch_its_videos() {
    let template = "https://www.youtube.com/feeds/videos.xml?channel_id={id}";
    let feed_url = template.replace("{id}", CHANNEL_ID);
    let fetcher = MemoryFetcher::default()
        .page(HANDLE_URL, landing_page())
        .page(&feed_url, channel_feed());

    // Resolve and persist
    let id = resolve_channel_id(&fetcher, HANDLE_URL, DEFAULT_FETCH_TIMEOUT).await.unwrap();
    assert_eq!(id, CHANNEL_ID);

    let dir = std::env::temp_dir().join("freshfeed_it_channels_add");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("channels.json");
    std::fs::remove_file(&path).ok();

    let mut list = ChannelList::load(&path).unwrap();
    list.insert(Source::new(channel_name_from_url(HANDLE_URL), id).with_url(HANDLE_URL))
        .unwrap();
    list.save(&path).unwrap();

    // Reload and aggregate
    let list = ChannelList::load(&path).unwrap();
    assert!(list.contains_url(HANDLE_URL));
    assert_eq!(list.channels[0].name, "@rustconf");

    let report = aggregate(
        &fetcher,
        &list.channels,
        &FeedProfile::video_channel(template),
        Cutoff::hours_ago(24.0).unwrap(),
        AggregateOptions::default(),
    )
    .await;

    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].title, "Keynote");
    assert_eq!(report.entries[0].link, "https://www.youtube.com/watch?v=vid001");
    assert_eq!(report.entries[0].source_name.as_deref(), Some("@rustconf"));
    assert_eq!(fetcher.requests(), vec![HANDLE_URL.to_string(), feed_url]);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_channel_path_url_needs_no_fetch() {
    let fetcher = MemoryFetcher::default();
    let url = format!("https://www.youtube.com/channel/{CHANNEL_ID}");

    let id = resolve_channel_id(&fetcher, &url, DEFAULT_FETCH_TIMEOUT).await.unwrap();

    assert_eq!(id, CHANNEL_ID);
    assert!(fetcher.requests().is_empty());
    assert_eq!(channel_name_from_url(&url), UNKNOWN_CHANNEL);
}

#[tokio::test]
async fn test_page_without_id_is_not_found() {
    let url = "https://www.youtube.com/c/somebody";
    let fetcher = MemoryFetcher::default().page(url, "<html><head></head></html>");

    let result = resolve_channel_id(&fetcher, url, DEFAULT_FETCH_TIMEOUT).await;
    assert!(matches!(result, Err(ResolveError::NotFound)));
    assert_eq!(
        result.unwrap_err().to_string(),
        "could not extract channel id"
    );
}

#[tokio::test]
async fn test_unreachable_page_is_fetch_error() {
    let fetcher = MemoryFetcher::default();
    let result =
        resolve_channel_id(&fetcher, "https://www.youtube.com/@gone", DEFAULT_FETCH_TIMEOUT).await;
    assert!(matches!(
        result,
        Err(ResolveError::Fetch(FetchError::HttpStatus(404)))
    ));
}

#[tokio::test]
async fn test_private_address_rejected_before_fetch() {
    let fetcher = MemoryFetcher::default();
    let result =
        resolve_channel_id(&fetcher, "http://10.0.0.5/@internal", DEFAULT_FETCH_TIMEOUT).await;
    assert!(matches!(result, Err(ResolveError::InvalidUrl(_))));
    assert!(fetcher.requests().is_empty());
}
