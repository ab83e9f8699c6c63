//! Media Storage Utility
//!
//! Answers questions about device ids against a live registry: is the
//! device attached, where is it mounted, which device holds a path.
//! Collaborators are injected so each caller (and each test) gets an
//! isolated instance.

use super::probe::{FsPathProbe, PathProbe};
use crate::device::{crack_device_id, make_device_id, DeviceType, RemovableStorageInfo, StorageDeviceInfo};
use crate::registry::DeviceRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Device lookups over an injected registry and path probe
pub struct MediaStorageUtil {
    registry: Arc<dyn DeviceRegistry>,
    probe: Arc<dyn PathProbe>,
}

impl MediaStorageUtil {
    /// Create a utility that probes the real filesystem
    pub fn new(registry: Arc<dyn DeviceRegistry>) -> Self {
        Self::with_probe(registry, Arc::new(FsPathProbe))
    }

    pub fn with_probe(registry: Arc<dyn DeviceRegistry>, probe: Arc<dyn PathProbe>) -> Self {
        Self { registry, probe }
    }

    pub fn registry(&self) -> &Arc<dyn DeviceRegistry> {
        &self.registry
    }

    /// Whether the device is currently available.
    ///
    /// Fixed storage is checked by probing its path; everything else must
    /// be present in the registry.
    ///
    /// # Panics
    ///
    /// Panics on a malformed device id.
    pub async fn is_device_attached(&self, device_id: &str) -> bool {
        let (device_type, unique_id) = crack_device_id(device_id);
        if device_type == DeviceType::FixedMassStorage {
            // For fixed storage the unique id is the path.
            return self.probe.exists(PathBuf::from(unique_id)).await;
        }

        let attached = self.registry.find_location_by_id(device_id).is_some();
        debug!(device_id, attached, "Registry lookup");
        attached
    }

    /// Callback form of [`is_device_attached`](Self::is_device_attached).
    ///
    /// `callback` runs exactly once, on a runtime task, after the check
    /// completes. The id is validated before anything is spawned.
    pub fn check_attached<F>(self: &Arc<Self>, device_id: String, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(bool) + Send + 'static,
    {
        crack_device_id(&device_id);
        let util = Arc::clone(self);
        tokio::spawn(async move {
            let attached = util.is_device_attached(&device_id).await;
            callback(attached);
        })
    }

    /// Resolve an absolute path to the device holding it.
    ///
    /// Paths on a known removable device get that device's id and a path
    /// relative to its mount point. Any other absolute path is reported as
    /// fixed storage rooted at the path itself. Relative paths give `None`.
    pub fn device_info_from_path(&self, path: &Path) -> Option<StorageDeviceInfo> {
        if !path.is_absolute() {
            return None;
        }

        if let Some(device) = self.registry.device_info_for_path(path) {
            if device.device_id.is_removable() {
                let relative_path = path
                    .strip_prefix(&device.location)
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                return Some(StorageDeviceInfo {
                    device_id: device.device_id,
                    name: device.name,
                    relative_path,
                });
            }
        }

        // TODO: distinguish "not removable" from "registry lookup failed" once
        // registries can report lookup errors; both currently land here.
        let unique_id = path.to_string_lossy();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| unique_id.to_string());
        Some(StorageDeviceInfo {
            device_id: make_device_id(DeviceType::FixedMassStorage, &unique_id),
            name,
            relative_path: PathBuf::new(),
        })
    }

    /// Current location of a device, if known.
    ///
    /// # Panics
    ///
    /// Panics on a malformed device id.
    pub fn find_device_path_by_id(&self, device_id: &str) -> Option<PathBuf> {
        let (device_type, unique_id) = crack_device_id(device_id);
        if device_type == DeviceType::FixedMassStorage {
            return Some(PathBuf::from(unique_id));
        }
        self.registry.find_location_by_id(device_id)
    }

    /// Attached devices that carry camera media
    pub fn attached_media_devices(&self) -> Vec<RemovableStorageInfo> {
        self.registry
            .attached_devices()
            .into_iter()
            .filter(|device| device.device_id.is_media())
            .collect()
    }
}
