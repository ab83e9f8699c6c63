//! Device Registry Module
//!
//! Live view of attached removable storage. Consumers only read from a
//! registry; platform notifiers keep it current and broadcast
//! [`RegistryEvent`]s as devices come and go.

pub mod events;
pub mod memory;
pub mod mount_table;
pub mod watcher;

pub use events::*;
pub use memory::*;
pub use mount_table::*;
pub use watcher::*;

use crate::config::MediaStorageConfig;
use crate::device::RemovableStorageInfo;
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Read access to the set of currently attached removable devices
pub trait DeviceRegistry: Send + Sync {
    /// Snapshot of every attached device
    fn attached_devices(&self) -> Vec<RemovableStorageInfo>;

    /// Device whose mount point is the closest ancestor of `path`
    fn device_info_for_path(&self, path: &Path) -> Option<RemovableStorageInfo>;

    /// Subscribe to attach/detach events
    fn subscribe(&self) -> broadcast::Receiver<RegistryEvent>;

    /// Mount location of an attached device, by exact id match
    fn find_location_by_id(&self, device_id: &str) -> Option<PathBuf> {
        self.attached_devices()
            .into_iter()
            .find(|info| info.device_id.as_str() == device_id)
            .map(|info| info.location)
    }
}

/// Pick the entry with the deepest mount point containing `path`
pub(crate) fn deepest_containing<'a, I>(devices: I, path: &Path) -> Option<&'a RemovableStorageInfo>
where
    I: IntoIterator<Item = &'a RemovableStorageInfo>,
{
    devices
        .into_iter()
        .filter(|info| info.contains_path(path))
        .max_by_key(|info| info.location.components().count())
}

/// Build the registry for the current platform.
///
/// Linux tracks removable block devices through the mount table. Other
/// platforms start with an empty in-memory registry fed by the embedder.
#[cfg(target_os = "linux")]
pub fn platform_registry(config: &MediaStorageConfig) -> Result<Arc<dyn DeviceRegistry>> {
    config.validate()?;
    let registry = Arc::new(MountTableRegistry::new(config.clone()));
    registry.refresh()?;
    Ok(registry)
}

#[cfg(not(target_os = "linux"))]
pub fn platform_registry(config: &MediaStorageConfig) -> Result<Arc<dyn DeviceRegistry>> {
    Ok(Arc::new(InMemoryDeviceRegistry::with_capacity(
        config.event_channel_capacity,
    )))
}
