use crate::feed::tree::{parse_document, strip_namespaces, Element, ParseError};
use crate::feed::types::{Entry, SourceKind, UNTITLED};
use crate::util::strip_control_chars;

/// Watch-page prefix used when a video entry carries no usable link.
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Which Atom date element is consulted first.
///
/// Blog feeds bump `updated` when a post is edited, which is what a reader
/// wants to see. Video platforms bump it on every metadata change, so for
/// them the publication date is the meaningful one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtomDates {
    #[default]
    UpdatedFirst,
    PublishedFirst,
}

/// Parses an RSS 2.0 or Atom document into entries with raw date strings.
///
/// `published_at` is left unset; see [`crate::feed::filter_fresh`].
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<Entry>, ParseError> {
    parse_feed_with(bytes, AtomDates::default())
}

/// Same as [`parse_feed`] with an explicit Atom date preference.
///
/// A well-formed document that is neither RSS nor Atom yields no entries
/// and no error.
pub fn parse_feed_with(bytes: &[u8], atom_dates: AtomDates) -> Result<Vec<Entry>, ParseError> {
    let root = strip_namespaces(parse_document(bytes)?);
    let channel = root.child("channel");
    let is_atom = root.name() == "feed";
    let mut entries = Vec::new();

    if let Some(channel) = channel {
        entries.extend(channel.children_named("item").map(rss_entry));
    }

    // Not exclusive with the RSS branch above
    if is_atom {
        entries.extend(
            root.children_named("entry")
                .map(|entry| atom_entry(entry, atom_dates)),
        );
    }

    if channel.is_none() && !is_atom {
        tracing::debug!(root = %root.name(), "Document is neither RSS nor Atom");
    }

    Ok(entries)
}

fn rss_entry(item: &Element) -> Entry {
    let published_raw = item
        .child_text("pubDate")
        .or_else(|| item.child_text("date"))
        .map(str::to_owned);

    Entry {
        source_name: None,
        title: title_of(item),
        link: item.child_text("link").unwrap_or_default().to_owned(),
        published_raw,
        published_at: None,
        source_kind: SourceKind::Rss,
        video_id: None,
    }
}

fn atom_entry(entry: &Element, atom_dates: AtomDates) -> Entry {
    let (first, second) = match atom_dates {
        AtomDates::UpdatedFirst => ("updated", "published"),
        AtomDates::PublishedFirst => ("published", "updated"),
    };
    let published_raw = entry
        .child_text(first)
        .or_else(|| entry.child_text(second))
        .map(str::to_owned);

    let video_id = entry.child_text("videoId").map(str::to_owned);

    // href wins over element text; an empty href counts as absent
    let link = entry
        .child("link")
        .and_then(|l| {
            l.attr("href")
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .or_else(|| l.text())
        })
        .map(str::to_owned)
        .or_else(|| video_id.as_ref().map(|id| format!("{WATCH_URL_PREFIX}{id}")))
        .unwrap_or_default();

    Entry {
        source_name: None,
        title: title_of(entry),
        link,
        published_raw,
        published_at: None,
        source_kind: SourceKind::Atom,
        video_id,
    }
}

fn title_of(element: &Element) -> String {
    // SEC-016: feed-controlled text may embed terminal escape sequences
    element
        .child_text("title")
        .map(|t| strip_control_chars(t).into_owned())
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_owned())
}
