//! Mount Table Registry
//!
//! Tracks removable block devices by parsing the mount table and reading
//! device attributes from sysfs and the `/dev/disk` symlink directories.
//! Each [`MountTableRegistry::refresh`] rebuilds the snapshot, diffs it
//! against the previous one and broadcasts the difference.

use super::{DeviceRegistry, RegistryEvent};
use crate::config::MediaStorageConfig;
use crate::device::{make_device_id, DeviceType, RemovableStorageInfo};
use crate::error::Result;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, info};

// =============================================================================
// Constants
// =============================================================================

/// Unique id prefix for devices identified by filesystem UUID
pub const FS_UUID_PREFIX: &str = "UUID:";

/// Unique id prefix for devices without a filesystem UUID
pub const BLOCK_NAME_PREFIX: &str = "DEV:";

const DCIM_DIR_NAMES: [&str; 2] = ["DCIM", "dcim"];

// =============================================================================
// Mount Table Parsing
// =============================================================================

/// One line of the mount table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: PathBuf,
    pub mount_point: PathBuf,
    pub fs_type: String,
}

impl MountEntry {
    /// Kernel block device name (`sdb1`), resolving `/dev` symlinks
    pub fn block_name(&self) -> Option<String> {
        let device = fs::canonicalize(&self.device).unwrap_or_else(|_| self.device.clone());
        device
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .map(|name| name.to_string())
    }
}

/// Parse mount table text, keeping only `/dev` backed mounts
pub fn parse_mounts(data: &str) -> Vec<MountEntry> {
    let mut mounts = Vec::new();
    for line in data.lines() {
        let mut parts = line.split_whitespace();
        let (device, mount_point, fs_type) = match (parts.next(), parts.next(), parts.next()) {
            (Some(device), Some(mount_point), Some(fs_type)) => (device, mount_point, fs_type),
            _ => continue,
        };
        if !device.starts_with("/dev/") {
            continue;
        }
        mounts.push(MountEntry {
            device: PathBuf::from(unescape_octal(device)),
            mount_point: PathBuf::from(unescape_octal(mount_point)),
            fs_type: fs_type.to_string(),
        });
    }
    mounts
}

/// Undo the `\040`-style escaping the kernel applies to mount fields
fn unescape_octal(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_triplet(&bytes[i + 1..i + 4]) {
            let code = (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            output.push(code);
            i += 4;
        } else {
            output.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&output).into_owned()
}

fn is_octal_triplet(digits: &[u8]) -> bool {
    digits.len() == 3
        && digits[0] <= b'3'
        && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}

/// Undo the `\x20`-style escaping udev applies to `/dev/disk` link names
fn unescape_hex(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'x') {
            let digits = bytes.get(i + 2..i + 4);
            let hex = digits
                .filter(|digits| digits.iter().all(u8::is_ascii_hexdigit))
                .and_then(|_| u8::from_str_radix(&value[i + 2..i + 4], 16).ok());
            if let Some(byte) = hex {
                output.push(byte);
                i += 4;
                continue;
            }
        }
        output.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&output).into_owned()
}

/// Map block device name to link name for a `/dev/disk/by-*` directory
fn read_link_dir(dir: &Path) -> HashMap<String, String> {
    let mut links = HashMap::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read {:?}: {}", dir, e);
            return links;
        }
    };
    for entry in entries.flatten() {
        let Ok(target) = fs::read_link(entry.path()) else {
            continue;
        };
        let Some(block) = target.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let link = unescape_hex(&entry.file_name().to_string_lossy());
        links.insert(block.to_string(), link);
    }
    links
}

fn read_string(path: impl AsRef<Path>) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn has_dcim(mount_point: &Path) -> bool {
    DCIM_DIR_NAMES
        .iter()
        .any(|name| mount_point.join(name).is_dir())
}

// =============================================================================
// Mount Table Registry
// =============================================================================

#[derive(Debug, Default)]
struct MountSnapshot {
    /// Every `/dev` mount point, removable or not
    mount_points: Vec<PathBuf>,
    /// Removable devices keyed by mount point
    removable: BTreeMap<PathBuf, RemovableStorageInfo>,
}

/// Registry of removable block devices backed by the mount table
#[derive(Debug)]
pub struct MountTableRegistry {
    config: MediaStorageConfig,
    state: RwLock<MountSnapshot>,
    /// Serializes refreshes so each change is diffed and announced once
    refresh_lock: Mutex<()>,
    event_sender: broadcast::Sender<RegistryEvent>,
}

impl MountTableRegistry {
    /// Create an empty registry; call [`refresh`](Self::refresh) to populate it
    pub fn new(config: MediaStorageConfig) -> Self {
        let (event_sender, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            config,
            state: RwLock::new(MountSnapshot::default()),
            refresh_lock: Mutex::new(()),
            event_sender,
        }
    }

    pub fn config(&self) -> &MediaStorageConfig {
        &self.config
    }

    /// Re-read the mount table and return the attach/detach events it caused.
    ///
    /// Blocks on filesystem reads; async callers should go through
    /// [`MountWatcher`](super::MountWatcher) or `spawn_blocking`.
    pub fn refresh(&self) -> Result<Vec<RegistryEvent>> {
        let _refreshing = self.refresh_lock.lock();

        let data = fs::read_to_string(&self.config.mounts_path)?;
        let mounts = parse_mounts(&data);
        let uuids = read_link_dir(&self.config.disk_by_uuid_path);
        let labels = read_link_dir(&self.config.disk_by_label_path);

        let previous: BTreeMap<PathBuf, RemovableStorageInfo> = self.state.read().removable.clone();
        let mut removable = BTreeMap::new();

        for mount in &mounts {
            let Some(block) = mount.block_name() else {
                continue;
            };
            if !self.is_removable_block(&block) {
                continue;
            }

            let unique_id = match uuids.get(&block) {
                Some(uuid) => format!("{}{}", FS_UUID_PREFIX, uuid),
                None => format!("{}{}", BLOCK_NAME_PREFIX, block),
            };

            // Same device still at the same place keeps its id and timestamp
            if let Some(existing) = previous.get(&mount.mount_point) {
                if existing.device_id.unique_id() == unique_id {
                    removable.insert(mount.mount_point.clone(), existing.clone());
                    continue;
                }
            }

            let device_type = if has_dcim(&mount.mount_point) {
                DeviceType::RemovableMassStorageWithDcim
            } else {
                DeviceType::RemovableMassStorageNoDcim
            };
            let name = labels
                .get(&block)
                .cloned()
                .or_else(|| self.disk_attribute(&block, "device/model"))
                .unwrap_or_else(|| block.clone());

            removable.insert(
                mount.mount_point.clone(),
                RemovableStorageInfo::new(
                    make_device_id(device_type, &unique_id),
                    name,
                    mount.mount_point.clone(),
                ),
            );
        }

        let events = diff_snapshots(&previous, &removable);

        {
            let mut state = self.state.write();
            state.mount_points = mounts.into_iter().map(|mount| mount.mount_point).collect();
            state.removable = removable;
        }

        for event in &events {
            match event {
                RegistryEvent::DeviceAttached { device_id, location, .. } => {
                    info!(device_id = %device_id, location = ?location, "Removable device attached");
                }
                RegistryEvent::DeviceDetached { device_id, location } => {
                    info!(device_id = %device_id, location = ?location, "Removable device detached");
                }
            }
            let _ = self.event_sender.send(event.clone());
        }

        Ok(events)
    }

    /// Check the sysfs `removable` flag, falling back to the parent disk for partitions
    fn is_removable_block(&self, block: &str) -> bool {
        self.disk_attribute(block, "removable")
            .and_then(|value| value.parse::<u8>().ok())
            .map(|value| value == 1)
            .unwrap_or(false)
    }

    fn disk_attribute(&self, block: &str, attribute: &str) -> Option<String> {
        let node = self.config.sysfs_path.join("class/block").join(block);
        if let Some(value) = read_string(node.join(attribute)) {
            return Some(value);
        }
        if node.join("partition").exists() {
            return read_string(node.join("..").join(attribute));
        }
        None
    }
}

fn diff_snapshots(
    previous: &BTreeMap<PathBuf, RemovableStorageInfo>,
    current: &BTreeMap<PathBuf, RemovableStorageInfo>,
) -> Vec<RegistryEvent> {
    let mut events = Vec::new();

    for (mount_point, old) in previous {
        let unchanged = current
            .get(mount_point)
            .is_some_and(|new| new.device_id == old.device_id);
        if !unchanged {
            events.push(RegistryEvent::DeviceDetached {
                device_id: old.device_id.clone(),
                location: old.location.clone(),
            });
        }
    }

    for (mount_point, new) in current {
        let unchanged = previous
            .get(mount_point)
            .is_some_and(|old| old.device_id == new.device_id);
        if !unchanged {
            events.push(RegistryEvent::DeviceAttached {
                device_id: new.device_id.clone(),
                name: new.name.clone(),
                location: new.location.clone(),
            });
        }
    }

    events
}

impl DeviceRegistry for MountTableRegistry {
    fn attached_devices(&self) -> Vec<RemovableStorageInfo> {
        self.state.read().removable.values().cloned().collect()
    }

    fn device_info_for_path(&self, path: &Path) -> Option<RemovableStorageInfo> {
        let state = self.state.read();
        let mount_point = state
            .mount_points
            .iter()
            .filter(|mount_point| path.starts_with(mount_point))
            .max_by_key(|mount_point| mount_point.components().count())?;
        state.removable.get(mount_point).cloned()
    }

    fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_sender.subscribe()
    }
}
