//! Registry Events
//!
//! Events emitted by device registries for external consumers to react to
//! devices coming and going.

use crate::device::DeviceId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Events emitted by a device registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A removable device was attached
    DeviceAttached {
        device_id: DeviceId,
        name: String,
        location: PathBuf,
    },

    /// A removable device went away
    DeviceDetached {
        device_id: DeviceId,
        location: PathBuf,
    },
}

impl RegistryEvent {
    /// Get the device ID associated with this event
    pub fn device_id(&self) -> &DeviceId {
        match self {
            RegistryEvent::DeviceAttached { device_id, .. } => device_id,
            RegistryEvent::DeviceDetached { device_id, .. } => device_id,
        }
    }

    /// Get the mount location associated with this event
    pub fn location(&self) -> &PathBuf {
        match self {
            RegistryEvent::DeviceAttached { location, .. } => location,
            RegistryEvent::DeviceDetached { location, .. } => location,
        }
    }

    pub fn is_attach(&self) -> bool {
        matches!(self, RegistryEvent::DeviceAttached { .. })
    }
}
