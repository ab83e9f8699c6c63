//! In-Memory Device Registry
//!
//! Registry fed directly by its owner. Used for MTP/PTP devices, which
//! never show up in a mount table, and on platforms without a native
//! notifier.

use super::{deepest_containing, DeviceRegistry, RegistryEvent};
use crate::device::RemovableStorageInfo;
use crate::error::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::path::Path;
use tokio::sync::broadcast;
use tracing::info;

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Concurrent registry keyed by device id
pub struct InMemoryDeviceRegistry {
    devices: DashMap<String, RemovableStorageInfo>,
    event_sender: broadcast::Sender<RegistryEvent>,
}

impl InMemoryDeviceRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a registry whose subscribers buffer `capacity` events (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let (event_sender, _) = broadcast::channel(capacity.max(1));
        Self {
            devices: DashMap::new(),
            event_sender,
        }
    }

    /// Record a newly attached device
    pub fn attach(&self, device: RemovableStorageInfo) -> Result<()> {
        let event = RegistryEvent::DeviceAttached {
            device_id: device.device_id.clone(),
            name: device.name.clone(),
            location: device.location.clone(),
        };

        // Check, insert and announce under the same shard lock
        match self.devices.entry(device.device_id.as_str().to_string()) {
            Entry::Occupied(entry) => Err(Error::DeviceAlreadyAttached {
                device_id: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                info!(device_id = %device.device_id, name = %device.name, "Device attached");
                let _stored = entry.insert(device);
                let _ = self.event_sender.send(event);
                Ok(())
            }
        }
    }

    /// Forget a device
    pub fn detach(&self, device_id: &str) -> Result<RemovableStorageInfo> {
        let (_, device) = self
            .devices
            .remove(device_id)
            .ok_or_else(|| Error::DeviceNotFound {
                device_id: device_id.to_string(),
            })?;

        info!(device_id = %device.device_id, "Device detached");
        let _ = self.event_sender.send(RegistryEvent::DeviceDetached {
            device_id: device.device_id.clone(),
            location: device.location.clone(),
        });
        Ok(device)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for InMemoryDeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry for InMemoryDeviceRegistry {
    fn attached_devices(&self) -> Vec<RemovableStorageInfo> {
        self.devices.iter().map(|entry| entry.value().clone()).collect()
    }

    fn device_info_for_path(&self, path: &Path) -> Option<RemovableStorageInfo> {
        let devices = self.attached_devices();
        deepest_containing(&devices, path).cloned()
    }

    fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_sender.subscribe()
    }

    fn find_location_by_id(&self, device_id: &str) -> Option<std::path::PathBuf> {
        self.devices.get(device_id).map(|entry| entry.location.clone())
    }
}
