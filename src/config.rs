//! Configuration file parser for ~/.config/freshfeed/config.toml.
//!
//! The config file is optional. A missing file yields `Config::default()`.
//! Unknown keys are accepted by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::feed::{
    AggregateOptions, FeedProfile, Source, DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_RESPONSE_BYTES,
    ID_PLACEHOLDER,
};
use crate::util::validate_url;

/// Default channel feed endpoint; `{id}` is replaced by the channel id.
pub const DEFAULT_CHANNEL_FEED_TEMPLATE: &str =
    "https://www.youtube.com/feeds/videos.xml?channel_id={id}";

/// Browser-like User-Agent; some hosts refuse requests without one.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A key parsed but holds an unusable value.
    #[error("Invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// One syndication feed entry under `[[feeds]]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default freshness window in hours.
    pub window_hours: f64,

    /// Per-fetch timeout in seconds.
    pub fetch_timeout_secs: u64,

    /// Upper bound on fetches in flight at once.
    pub max_concurrent_fetches: usize,

    /// Response body size limit for a single fetch.
    pub max_response_bytes: usize,

    pub user_agent: String,

    /// Video channel feed URL template. Must contain `{id}`.
    pub channel_feed_template: String,

    /// Syndication feeds to aggregate.
    pub feeds: Vec<FeedConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_hours: 24.0,
            fetch_timeout_secs: 30,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            channel_feed_template: DEFAULT_CHANNEL_FEED_TEMPLATE.to_string(),
            feeds: Vec::new(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "window_hours",
        "fetch_timeout_secs",
        "max_concurrent_fetches",
        "max_response_bytes",
        "user_agent",
        "channel_feed_template",
        "feeds",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            window_hours = config.window_hours,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.window_hours.is_finite() || self.window_hours < 0.0 {
            return Err(ConfigError::Invalid {
                key: "window_hours",
                reason: format!("{} is not a non-negative number of hours", self.window_hours),
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::Invalid {
                key: "max_concurrent_fetches",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "max_response_bytes",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.channel_feed_template.contains(ID_PLACEHOLDER) {
            return Err(ConfigError::Invalid {
                key: "channel_feed_template",
                reason: format!("must contain {ID_PLACEHOLDER}"),
            });
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            timeout: self.fetch_timeout(),
            max_concurrent: self.max_concurrent_fetches,
        }
    }

    pub fn video_profile(&self) -> FeedProfile {
        FeedProfile::video_channel(self.channel_feed_template.clone())
    }

    /// Configured feeds as aggregation sources.
    ///
    /// SEC-001: Feeds whose URL fails SSRF validation are skipped with a warning.
    pub fn feed_sources(&self) -> Vec<Source> {
        self.feeds
            .iter()
            .filter_map(|feed| match validate_url(feed.url.trim()) {
                Ok(url) => Some(Source::new(feed.name.clone(), url.to_string())),
                Err(e) => {
                    tracing::warn!(feed = %feed.name, url = %feed.url, error = %e, "Skipping feed");
                    None
                }
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window_hours, 24.0);
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.max_concurrent_fetches, 8);
        assert_eq!(config.max_response_bytes, 10 * 1024 * 1024);
        assert!(config.channel_feed_template.contains("{id}"));
        assert!(config.feeds.is_empty());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/freshfeed_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.window_hours, 24.0);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let dir = std::env::temp_dir().join("freshfeed_config_test_whitespace");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "   \n  \n  ").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.fetch_timeout_secs, 30);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let config = Config::from_toml("window_hours = 6.5\n").unwrap();
        assert_eq!(config.window_hours, 6.5);
        assert_eq!(config.max_concurrent_fetches, 8);
    }

    #[test]
    fn test_full_config() {
        let dir = std::env::temp_dir().join("freshfeed_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
window_hours = 48
fetch_timeout_secs = 10
max_concurrent_fetches = 2
max_response_bytes = 1024
user_agent = "freshfeed-test"
channel_feed_template = "https://videos.example.com/feed/{id}.xml"

[[feeds]]
name = "Example"
url = "https://example.com/feed.xml"

[[feeds]]
name = "Other"
url = "https://other.example.org/atom"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.window_hours, 48.0);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.aggregate_options().max_concurrent, 2);
        assert_eq!(config.max_response_bytes, 1024);
        assert_eq!(config.user_agent, "freshfeed-test");
        assert_eq!(
            config.feeds,
            vec![
                FeedConfig {
                    name: "Example".to_string(),
                    url: "https://example.com/feed.xml".to_string(),
                },
                FeedConfig {
                    name: "Other".to_string(),
                    url: "https://other.example.org/atom".to_string(),
                },
            ]
        );
        assert_eq!(
            config.video_profile().feed_url(&Source::new("c", "UC1")),
            "https://videos.example.com/feed/UC1.xml"
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::from_toml("this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let content = r#"
window_hours = 12
totally_fake_key = "should not fail"
"#;
        let config = Config::from_toml(content).unwrap();
        assert_eq!(config.window_hours, 12.0);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        assert!(Config::from_toml("window_hours = \"soon\"\n").is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (content, key) in [
            ("window_hours = -1.0", "window_hours"),
            ("window_hours = nan", "window_hours"),
            ("window_hours = inf", "window_hours"),
            ("fetch_timeout_secs = 0", "fetch_timeout_secs"),
            ("max_concurrent_fetches = 0", "max_concurrent_fetches"),
            ("max_response_bytes = 0", "max_response_bytes"),
            ("channel_feed_template = \"https://x.example/feed\"", "channel_feed_template"),
        ] {
            match Config::from_toml(content) {
                Err(ConfigError::Invalid { key: k, .. }) => assert_eq!(k, key, "{content}"),
                other => panic!("expected Invalid for {content}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_zero_window_allowed() {
        assert_eq!(Config::from_toml("window_hours = 0").unwrap().window_hours, 0.0);
    }

    #[test]
    fn test_feed_sources_skips_unsafe_urls() {
        let content = r#"
[[feeds]]
name = "Public"
url = "https://example.com/feed.xml"

[[feeds]]
name = "Internal"
url = "http://192.168.1.1/feed"

[[feeds]]
name = "Local file"
url = "file:///etc/passwd"
"#;
        let config = Config::from_toml(content).unwrap();
        let sources = config.feed_sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "Public");
        assert_eq!(sources[0].id, "https://example.com/feed.xml");
    }

    // SEC-014: File size limit
    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("freshfeed_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = "a".repeat(1_048_577);
        std::fs::write(&path, content).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
