//! Minimal owned XML element tree and namespace-prefix removal.
//!
//! Feeds are small enough that building a tree is cheaper to reason about
//! than driving the schema logic straight off the event stream. The tree
//! keeps qualified names exactly as written; [`strip_namespaces`] rewrites
//! them to local names so RSS, Atom and vendor extensions (`yt:videoId`,
//! `dc:date`) can all be queried with bare tag names.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// SEC-003: Maximum element nesting accepted from a remote document.
const MAX_DEPTH: usize = 256;

/// Errors raised while reading feed bytes into a tree.
#[derive(Debug, Error)]
pub enum ParseError {
    /// quick-xml rejected the input (mismatched tags, bad escapes, bad UTF-8)
    #[error("XML parse error: {0}")]
    Xml(String),
    /// The document contained no element at all
    #[error("document has no root element")]
    NoRoot,
    /// Input ended while an element was still open
    #[error("unexpected end of document: <{0}> is not closed")]
    Unclosed(String),
    /// A second top-level element or stray text followed the root
    #[error("content after the root element")]
    TrailingContent,
    /// SEC-003: Nesting exceeded [`MAX_DEPTH`]
    #[error("element nesting exceeds maximum of {0} levels")]
    TooDeep(usize),
}

/// One XML element with its attributes, direct text and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn new(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First direct child with the given tag name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given tag name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed direct text, or `None` when the element has no text.
    pub fn text(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    /// Text of the first child named `name`; `None` if the child is absent or empty.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(Element::text)
    }
}

/// Parses raw bytes into an element tree.
///
/// The character encoding comes from a byte order mark or the XML
/// declaration (`encoding="ISO-8859-1"`), defaulting to UTF-8; names, text
/// and attribute values are all decoded with it. Comments, processing
/// instructions and the doctype are ignored. Entity references other than
/// the five XML builtins are rejected by quick-xml (SEC-002), which surfaces
/// here as [`ParseError::Xml`].
pub fn parse_document(bytes: &[u8]) -> Result<Element, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if root.is_some() {
                    return Err(ParseError::TrailingContent);
                }
                if stack.len() >= MAX_DEPTH {
                    return Err(ParseError::TooDeep(MAX_DEPTH));
                }
                stack.push(start_element(&e, &reader)?);
            }
            Ok(Event::Empty(e)) => {
                let element = start_element(&e, &reader)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                // quick-xml checks end names, so the top of the stack is the matching element
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::Xml("unbalanced end tag".to_owned()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| ParseError::Xml(e.to_string()))?;
                push_text(&mut stack, root.is_some(), &text)?;
            }
            Ok(Event::CData(e)) => {
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|e| ParseError::Xml(e.to_string()))?;
                push_text(&mut stack, root.is_some(), &text)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.pop() {
        return Err(ParseError::Unclosed(open.name));
    }
    root.ok_or(ParseError::NoRoot)
}

fn start_element(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<Element, ParseError> {
    let decoder = reader.decoder();
    let name = decoder
        .decode(e.name().as_ref())
        .map_err(|e| ParseError::Xml(e.to_string()))?
        .into_owned();
    let mut attributes = Vec::new();

    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(err) => {
                tracing::debug!(element = %name, error = %err, "Skipping malformed attribute");
                continue;
            }
        };
        let key = decoder
            .decode(attr.key.as_ref())
            .map_err(|e| ParseError::Xml(e.to_string()))?
            .into_owned();
        let value = attr
            .decode_and_unescape_value(decoder)
            .map_err(|e| ParseError::Xml(e.to_string()))?;
        attributes.push((key, value.into_owned()));
    }

    Ok(Element::new(name, attributes))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ParseError::TrailingContent),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], after_root: bool, text: &str) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(open) => open.text.push_str(text),
        // Whitespace around the root (and before it) is insignificant
        None if text.trim().is_empty() => {}
        None if after_root => return Err(ParseError::TrailingContent),
        None => return Err(ParseError::Xml("text before the root element".to_owned())),
    }
    Ok(())
}

/// Returns the local part of a qualified name.
///
/// Handles both prefixed names (`atom:entry`) and Clark notation
/// (`{http://www.w3.org/2005/Atom}entry`).
pub fn local_name(qualified: &str) -> &str {
    let without_uri = match qualified.strip_prefix('{') {
        Some(rest) => rest.split_once('}').map_or(qualified, |(_, local)| local),
        None => qualified,
    };
    without_uri
        .rsplit_once(':')
        .map_or(without_uri, |(_, local)| local)
}

/// Rewrites every element name, and every non-`xmlns` attribute key, to its local name.
///
/// Purely structural: no validation happens and nothing can fail. A document
/// without namespaces comes back unchanged.
pub fn strip_namespaces(mut element: Element) -> Element {
    strip_in_place(&mut element);
    element
}

fn strip_in_place(element: &mut Element) {
    let local = local_name(&element.name);
    if local.len() != element.name.len() {
        element.name = local.to_owned();
    }

    for (key, _) in element.attributes.iter_mut() {
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let local = local_name(key);
        if local.len() != key.len() {
            *key = local.to_owned();
        }
    }

    for child in element.children.iter_mut() {
        strip_in_place(child);
    }
}
