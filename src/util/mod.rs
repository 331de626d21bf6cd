//! Input hygiene for URLs and text that arrive from configuration, the
//! command line, or remote documents.
//!
//! - **URL validation**: Rejects schemes and hosts that would let a feed or
//!   channel URL reach local or private services (SSRF)
//! - **Text cleanup**: Removes terminal control sequences from feed text
//!
//! # Examples
//!
//! ```
//! use freshfeed::util::{strip_control_chars, validate_url};
//!
//! let url = validate_url("https://example.com/feed.xml").unwrap();
//! assert_eq!(url.host_str(), Some("example.com"));
//!
//! assert_eq!(strip_control_chars("Title\x07"), "Title");
//! ```

mod text;
mod url_validator;

pub use text::strip_control_chars;
pub use url_validator::{validate_url, UrlValidationError};
