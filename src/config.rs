//! Configuration
//!
//! Where the platform exposes its mount table and block device metadata,
//! and how often the mount-table registry is refreshed. Loaded from YAML,
//! with every field optional.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for registries and the mount watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaStorageConfig {
    /// Mount table to parse
    pub mounts_path: PathBuf,
    /// Path to sysfs (for testing)
    pub sysfs_path: PathBuf,
    /// Directory of filesystem UUID symlinks
    pub disk_by_uuid_path: PathBuf,
    /// Directory of filesystem label symlinks
    pub disk_by_label_path: PathBuf,
    /// Mount table refresh interval in seconds
    pub poll_interval_secs: u64,
    /// Buffered events per subscriber before lagging
    pub event_channel_capacity: usize,
}

impl Default for MediaStorageConfig {
    fn default() -> Self {
        Self {
            mounts_path: PathBuf::from("/proc/self/mounts"),
            sysfs_path: PathBuf::from("/sys"),
            disk_by_uuid_path: PathBuf::from("/dev/disk/by-uuid"),
            disk_by_label_path: PathBuf::from("/dev/disk/by-label"),
            poll_interval_secs: 2,
            event_channel_capacity: 256,
        }
    }
}

impl MediaStorageConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(Error::Configuration(
                "pollIntervalSecs must be greater than zero".into(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::Configuration(
                "eventChannelCapacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = MediaStorageConfig::default();
        config.validate().unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = MediaStorageConfig::from_yaml(
            "mountsPath: /tmp/mounts\npollIntervalSecs: 10\n",
        )
        .unwrap();
        assert_eq!(config.mounts_path, PathBuf::from("/tmp/mounts"));
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.sysfs_path, PathBuf::from("/sys"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert_matches!(
            MediaStorageConfig::from_yaml("pollIntervalSecs: 0\n"),
            Err(Error::Configuration(_))
        );
    }

    #[test]
    fn test_bad_yaml_rejected() {
        assert_matches!(
            MediaStorageConfig::from_yaml("pollIntervalSecs: [1, 2]\n"),
            Err(Error::ConfigParse(_))
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "eventChannelCapacity: 8").unwrap();

        let config = MediaStorageConfig::load(file.path()).unwrap();
        assert_eq!(config.event_channel_capacity, 8);

        assert_matches!(
            MediaStorageConfig::load("/nonexistent/media-storage.yaml"),
            Err(Error::Configuration(_))
        );
    }
}
