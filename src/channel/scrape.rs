//! String scanning over raw HTML (no HTML parser dependency).
//!
//! Tag and attribute names are matched ASCII-case-insensitively while values
//! are returned from the original text so their case is preserved. Searching
//! an ASCII-lowercased copy keeps byte offsets identical to the original.

/// Returns every opening tag `<name ...>` in `html`, as written.
pub(crate) fn find_tags<'a>(html: &'a str, name: &str) -> Vec<&'a str> {
    let lower = html.to_ascii_lowercase();
    let needle = format!("<{}", name.to_ascii_lowercase());
    let mut tags = Vec::new();
    let mut search_from = 0;

    while let Some(offset) = lower[search_from..].find(&needle) {
        let start = search_from + offset;
        let after_name = start + needle.len();

        // `<meta` must not match `<metadata`
        let boundary = lower.as_bytes().get(after_name).copied();
        let is_tag = matches!(
            boundary,
            Some(b) if b.is_ascii_whitespace() || b == b'/' || b == b'>'
        );

        let Some(end) = lower[start..].find('>').map(|pos| start + pos) else {
            break;
        };

        if is_tag {
            tags.push(&html[start..=end]);
        }
        search_from = after_name;
    }

    tags
}

/// Extracts a quoted attribute value from a tag string (case-preserving).
///
/// The attribute name must start a word, so `href` does not match `data-href`.
pub(crate) fn attr_value<'a>(tag: &'a str, attr_name: &str) -> Option<&'a str> {
    let tag_lower = tag.to_ascii_lowercase();
    let pattern = format!("{}=", attr_name.to_ascii_lowercase());
    let mut search_from = 0;

    while let Some(offset) = tag_lower[search_from..].find(&pattern) {
        let start = search_from + offset;
        search_from = start + pattern.len();

        let preceded_by_space = start > 0 && tag_lower.as_bytes()[start - 1].is_ascii_whitespace();
        if !preceded_by_space {
            continue;
        }

        let rest = &tag[search_from..];
        let quote = *rest.as_bytes().first()?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }

        let inner = &rest[1..];
        let end = inner.find(quote as char)?;
        return Some(&inner[..end]);
    }

    None
}

/// Checks whether the tag has `attr_name` equal to `value` (ASCII case-insensitive).
pub(crate) fn has_attr(tag: &str, attr_name: &str, value: &str) -> bool {
    attr_value(tag, attr_name).is_some_and(|v| v.trim().eq_ignore_ascii_case(value))
}

/// Finds every `"key":"value"` in embedded script data and returns the values in order.
///
/// Whitespace around the colon is tolerated; escaped quotes inside the
/// value are not (identifiers never contain them). Non-string values are
/// skipped.
pub(crate) fn json_string_values<'a>(text: &'a str, key: &str) -> Vec<&'a str> {
    let needle = format!("\"{key}\"");
    let mut values = Vec::new();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find(&needle) {
        let after_key = search_from + offset + needle.len();
        search_from = after_key;

        let rest = text[after_key..].trim_start();
        let Some(rest) = rest.strip_prefix(':') else {
            continue;
        };
        let Some(value) = rest.trim_start().strip_prefix('"') else {
            continue;
        };
        if let Some(end) = value.find('"') {
            values.push(&value[..end]);
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tags_case_insensitive() {
        let html = r#"<html><HEAD><META name="a" content="1"><meta content="2"/></HEAD></html>"#;
        let tags = find_tags(html, "meta");
        assert_eq!(tags, vec![r#"<META name="a" content="1">"#, r#"<meta content="2"/>"#]);
    }

    #[test]
    fn test_find_tags_requires_name_boundary() {
        let html = r#"<metadata x="1"><meta y="2">"#;
        assert_eq!(find_tags(html, "meta"), vec![r#"<meta y="2">"#]);
    }

    #[test]
    fn test_find_tags_unterminated() {
        assert!(find_tags("<meta content=\"x\"", "meta").is_empty());
    }

    #[test]
    fn test_attr_value_quotes_and_case() {
        let tag = r#"<link REL='canonical' href="https://Example.com/Channel/UCx">"#;
        assert_eq!(attr_value(tag, "rel"), Some("canonical"));
        assert_eq!(attr_value(tag, "href"), Some("https://Example.com/Channel/UCx"));
        assert_eq!(attr_value(tag, "title"), None);
    }

    #[test]
    fn test_attr_value_skips_prefixed_names() {
        let tag = r#"<link data-href="wrong" href="right">"#;
        assert_eq!(attr_value(tag, "href"), Some("right"));
    }

    #[test]
    fn test_attr_value_unquoted_is_none() {
        assert_eq!(attr_value("<meta content=abc>", "content"), None);
    }

    #[test]
    fn test_has_attr() {
        let tag = r#"<meta itemprop="channelId" content="UC1">"#;
        assert!(has_attr(tag, "itemprop", "channelid"));
        assert!(!has_attr(tag, "itemprop", "name"));
    }

    #[test]
    fn test_json_string_values() {
        let text = r#"var data = {"title":"x","externalId" : "UCabc","other":1};"#;
        assert_eq!(json_string_values(text, "externalId"), vec!["UCabc"]);
        assert!(json_string_values(text, "missing").is_empty());
    }

    #[test]
    fn test_json_string_values_skips_non_string() {
        let text = r#"{"externalId":null,"nested":{"externalId":"UCz"}}"#;
        assert_eq!(json_string_values(text, "externalId"), vec!["UCz"]);
    }

    #[test]
    fn test_json_string_values_returns_every_occurrence() {
        let text = r#"{"externalId":"bad id","a":{"externalId":"UC1"},"b":{"externalId":"UC2"}}"#;
        assert_eq!(
            json_string_values(text, "externalId"),
            vec!["bad id", "UC1", "UC2"]
        );
    }

    #[test]
    fn test_non_ascii_content_keeps_offsets() {
        let html = "<p>Ünïcødé</p><meta itemprop=\"channelId\" content=\"UCü\">";
        let tags = find_tags(html, "meta");
        assert_eq!(attr_value(tags[0], "content"), Some("UCü"));
    }
}
