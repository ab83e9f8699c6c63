//! Media Storage Util
//!
//! Opaque identifiers for removable media devices, and lookups against a
//! live registry of attached storage.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      MediaStorageUtil                         │
//! │   is_device_attached · device_info_from_path · find_path      │
//! ├──────────────────────────────┬────────────────────────────────┤
//! │     Device Id Codec          │        PathProbe               │
//! │  dcim: nodcim: path: mtp:    │   (blocking pool existence)    │
//! ├──────────────────────────────┴────────────────────────────────┤
//! │                     DeviceRegistry                            │
//! │  ┌──────────────────────┐    ┌─────────────────────────────┐  │
//! │  │  InMemoryRegistry    │    │  MountTableRegistry (Linux) │  │
//! │  │  (MTP, embedders)    │    │  + MountWatcher             │  │
//! │  └──────────────────────┘    └─────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`device`]: Device id codec and device records
//! - [`registry`]: Registry capability, implementations and events
//! - [`storage`]: Attachment checks and path resolution
//! - [`config`]: Configuration
//! - [`error`]: Error types and handling

pub mod config;
pub mod device;
pub mod error;
pub mod registry;
pub mod storage;

// Re-export commonly used types
pub use config::MediaStorageConfig;

pub use device::{
    crack_device_id, is_mass_storage_device, is_media_device, is_removable_device,
    make_device_id, DeviceId, DeviceType, RemovableStorageInfo, StorageDeviceInfo,
};

pub use error::{Error, Result};

pub use registry::{
    platform_registry, DeviceRegistry, InMemoryDeviceRegistry, MountTableRegistry, MountWatcher,
    RegistryEvent,
};

pub use storage::{FsPathProbe, MediaStorageUtil, PathProbe};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
