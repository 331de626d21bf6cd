use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

use crate::feed::Source;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access channel list: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid channel list JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Channel already tracked: {0}")]
    Duplicate(String),
}

/// Tracked video channels, persisted as `{"channels": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelList {
    #[serde(default)]
    pub channels: Vec<Source>,
}

impl ChannelList {
    /// Loads the list; a missing file is an empty list.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No channel list found, starting empty");
                return Ok(Self::default());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the list atomically: temp file, fsync, rename.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        use std::time::{SystemTime, UNIX_EPOCH};

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;

        // SEC-009: Randomized temp filename to prevent TOCTOU race conditions
        let random_suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = path.with_extension(format!("tmp.{:016x}", random_suffix));

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;

        let written = file
            .write_all(content.as_bytes())
            .and_then(|()| file.write_all(b"\n"))
            .and_then(|()| file.sync_all());
        drop(file);

        if let Err(e) = written.and_then(|()| std::fs::rename(&temp_path, path)) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(StoreError::Io(e));
        }

        Ok(())
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.channels
            .iter()
            .any(|c| c.url.as_deref() == Some(url))
    }

    /// Appends a channel. A channel whose page URL is already tracked is rejected.
    pub fn insert(&mut self, channel: Source) -> Result<(), StoreError> {
        if let Some(url) = channel.url.as_deref() {
            if self.contains_url(url) {
                return Err(StoreError::Duplicate(url.to_owned()));
            }
        }
        self.channels.push(channel);
        Ok(())
    }

    /// Removes every channel whose page URL or id equals `url_or_id`.
    ///
    /// Returns `true` if anything was removed.
    pub fn remove(&mut self, url_or_id: &str) -> bool {
        let before = self.channels.len();
        self.channels
            .retain(|c| c.id != url_or_id && c.url.as_deref() != Some(url_or_id));
        self.channels.len() < before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn channel(name: &str, id: &str) -> Source {
        Source::new(name, id).with_url(format!("https://www.youtube.com/@{name}"))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let path = Path::new("/tmp/freshfeed_test_nonexistent_channels.json");
        assert_eq!(ChannelList::load(path).unwrap(), ChannelList::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join("freshfeed_store_test_roundtrip");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("channels.json");

        let mut list = ChannelList::default();
        list.insert(channel("alpha", "UCa")).unwrap();
        list.insert(Source::new("beta", "UCb")).unwrap();
        list.save(&path).unwrap();

        let loaded = ChannelList::load(&path).unwrap();
        assert_eq!(loaded, list);

        // No temp files left behind
        let leftovers = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains("tmp"))
            .count();
        assert_eq!(leftovers, 0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_reads_plain_channel_records() {
        let dir = std::env::temp_dir().join("freshfeed_store_test_plain");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("channels.json");
        std::fs::write(
            &path,
            r#"{"channels":[{"url":"https://www.youtube.com/@x","id":"UCx","name":"@x"}]}"#,
        )
        .unwrap();

        let list = ChannelList::load(&path).unwrap();
        assert_eq!(list.channels.len(), 1);
        assert_eq!(list.channels[0].id, "UCx");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = std::env::temp_dir().join("freshfeed_store_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("channels.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            ChannelList::load(&path),
            Err(StoreError::Json(_))
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_duplicate_url_rejected() {
        let mut list = ChannelList::default();
        list.insert(channel("alpha", "UCa")).unwrap();
        let result = list.insert(channel("alpha", "UCother"));
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
        assert_eq!(list.channels.len(), 1);
    }

    #[test]
    fn test_remove_by_url_or_id() {
        let mut list = ChannelList::default();
        list.insert(channel("alpha", "UCa")).unwrap();
        list.insert(channel("beta", "UCb")).unwrap();

        assert!(list.remove("UCa"));
        assert!(list.remove("https://www.youtube.com/@beta"));
        assert!(!list.remove("UCmissing"));
        assert!(list.channels.is_empty());
    }
}
