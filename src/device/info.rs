//! Device Records
//!
//! Plain data describing attached removable storage and the result of
//! resolving a filesystem path to its device.

use super::id::DeviceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A removable device currently known to a registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovableStorageInfo {
    /// Device identifier
    pub device_id: DeviceId,
    /// Human-readable name (volume label, model or block device name)
    pub name: String,
    /// Current mount point; empty for devices without a filesystem mount
    pub location: PathBuf,
    /// When the registry first saw the device
    pub attached_at: DateTime<Utc>,
}

impl RemovableStorageInfo {
    pub fn new(device_id: DeviceId, name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            device_id,
            name: name.into(),
            location: location.into(),
            attached_at: Utc::now(),
        }
    }

    /// Whether `path` lives under this device's mount point
    pub fn contains_path(&self, path: &Path) -> bool {
        !self.location.as_os_str().is_empty() && path.starts_with(&self.location)
    }
}

/// Device that holds a given filesystem path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageDeviceInfo {
    pub device_id: DeviceId,
    pub name: String,
    /// Path relative to the device's mount point
    pub relative_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{make_device_id, DeviceType};

    #[test]
    fn test_contains_path() {
        let info = RemovableStorageInfo::new(
            make_device_id(DeviceType::RemovableMassStorageNoDcim, "UUID:1"),
            "USB",
            "/media/usb",
        );
        assert!(info.contains_path(Path::new("/media/usb/photos/a.jpg")));
        assert!(info.contains_path(Path::new("/media/usb")));
        // Component-wise, not string prefix
        assert!(!info.contains_path(Path::new("/media/usb2/a.jpg")));
    }

    #[test]
    fn test_unmounted_device_contains_nothing() {
        let info = RemovableStorageInfo::new(
            make_device_id(DeviceType::MtpOrPtp, "phone"),
            "Phone",
            PathBuf::new(),
        );
        assert!(!info.contains_path(Path::new("/anything")));
    }
}
