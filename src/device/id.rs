//! Device Identifier Codec
//!
//! Packs a storage device class and a class-specific unique id into one
//! opaque string of the form `<prefix>:<unique id>`, and takes it apart
//! again.
//!
//! | Class                              | Prefix    | Unique id            |
//! |------------------------------------|-----------|----------------------|
//! | Removable mass storage with DCIM   | `dcim:`   | hardware id          |
//! | Removable mass storage without     | `nodcim:` | hardware id          |
//! | Fixed mass storage                 | `path:`   | absolute path (UTF-8)|
//! | MTP / PTP device                   | `mtp:`    | hardware id          |
//!
//! Identifiers handed around inside the process are assumed to have been
//! built by [`make_device_id`]. Cracking anything else panics. Untrusted
//! strings go through [`DeviceId::parse`] instead.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// Constants
// =============================================================================

const REMOVABLE_MASS_STORAGE_WITH_DCIM_PREFIX: &str = "dcim:";
const REMOVABLE_MASS_STORAGE_NO_DCIM_PREFIX: &str = "nodcim:";
const FIXED_MASS_STORAGE_PREFIX: &str = "path:";
const MTP_OR_PTP_PREFIX: &str = "mtp:";

// =============================================================================
// Device Type
// =============================================================================

/// How a storage device should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Removable mass storage whose root holds a DCIM directory
    RemovableMassStorageWithDcim,
    /// Removable mass storage without camera media
    RemovableMassStorageNoDcim,
    /// Fixed, local mass storage; the unique id is a path
    FixedMassStorage,
    /// Media/Picture Transfer Protocol device
    MtpOrPtp,
}

impl DeviceType {
    /// All device types, in prefix-matching order
    pub const ALL: [DeviceType; 4] = [
        DeviceType::RemovableMassStorageWithDcim,
        DeviceType::RemovableMassStorageNoDcim,
        DeviceType::FixedMassStorage,
        DeviceType::MtpOrPtp,
    ];

    /// Identifier prefix, including the trailing colon
    pub const fn prefix(self) -> &'static str {
        match self {
            DeviceType::RemovableMassStorageWithDcim => REMOVABLE_MASS_STORAGE_WITH_DCIM_PREFIX,
            DeviceType::RemovableMassStorageNoDcim => REMOVABLE_MASS_STORAGE_NO_DCIM_PREFIX,
            DeviceType::FixedMassStorage => FIXED_MASS_STORAGE_PREFIX,
            DeviceType::MtpOrPtp => MTP_OR_PTP_PREFIX,
        }
    }

    /// Look up the type for a prefix (colon included)
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.prefix() == prefix)
    }

    pub const fn is_media(self) -> bool {
        matches!(
            self,
            DeviceType::RemovableMassStorageWithDcim | DeviceType::MtpOrPtp
        )
    }

    pub const fn is_removable(self) -> bool {
        !matches!(self, DeviceType::FixedMassStorage)
    }

    pub const fn is_mass_storage(self) -> bool {
        !matches!(self, DeviceType::MtpOrPtp)
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = self.prefix();
        write!(f, "{}", &prefix[..prefix.len() - 1])
    }
}

// =============================================================================
// Codec
// =============================================================================

/// Build a device id from a type and a non-empty unique id.
///
/// # Panics
///
/// Panics if `unique_id` is empty.
pub fn make_device_id(device_type: DeviceType, unique_id: &str) -> DeviceId {
    assert!(
        !unique_id.is_empty(),
        "device unique id must not be empty ({} device)",
        device_type
    );
    DeviceId(format!("{}{}", device_type.prefix(), unique_id))
}

/// Split a device id into its type and unique id.
///
/// The unique id is everything after the first colon and is returned even
/// when empty.
///
/// # Panics
///
/// Panics if the id does not start with a known prefix.
pub fn crack_device_id(device_id: &str) -> (DeviceType, &str) {
    match try_crack(device_id) {
        Some(parts) => parts,
        None => panic!("malformed device id: {:?}", device_id),
    }
}

/// True for DCIM mass storage and MTP/PTP devices.
pub fn is_media_device(device_id: &str) -> bool {
    crack_device_id(device_id).0.is_media()
}

/// True for everything except fixed mass storage.
pub fn is_removable_device(device_id: &str) -> bool {
    crack_device_id(device_id).0.is_removable()
}

/// True for everything except MTP/PTP devices.
pub fn is_mass_storage_device(device_id: &str) -> bool {
    crack_device_id(device_id).0.is_mass_storage()
}

fn try_crack(device_id: &str) -> Option<(DeviceType, &str)> {
    let colon = device_id.find(':')?;
    let (prefix, rest) = device_id.split_at(colon + 1);
    DeviceType::from_prefix(prefix).map(|ty| (ty, rest))
}

// =============================================================================
// Device Id
// =============================================================================

/// Opaque device identifier with a known prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// See [`make_device_id`].
    pub fn new(device_type: DeviceType, unique_id: &str) -> Self {
        make_device_id(device_type, unique_id)
    }

    /// Parse an identifier from outside the process
    pub fn parse(device_id: &str) -> Result<Self> {
        match try_crack(device_id) {
            Some(_) => Ok(Self(device_id.to_string())),
            None => Err(Error::MalformedDeviceId {
                device_id: device_id.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn device_type(&self) -> DeviceType {
        crack_device_id(&self.0).0
    }

    pub fn unique_id(&self) -> &str {
        crack_device_id(&self.0).1
    }

    pub fn is_media(&self) -> bool {
        self.device_type().is_media()
    }

    pub fn is_removable(&self) -> bool {
        self.device_type().is_removable()
    }

    pub fn is_mass_storage(&self) -> bool {
        self.device_type().is_mass_storage()
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        match try_crack(&s) {
            Some(_) => Ok(Self(s)),
            None => Err(Error::MalformedDeviceId { device_id: s }),
        }
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_make_fixed_storage_id() {
        let id = make_device_id(DeviceType::FixedMassStorage, "/mnt/usb");
        assert_eq!(id.as_str(), "path:/mnt/usb");
    }

    #[test]
    fn test_make_then_crack_every_type() {
        let unique_ids = [
            "ABC123",
            "UUID:12:34",
            "My Card",
            "카메라/写真",
            "/media/usb stick",
            "dcim:nested",
        ];
        for ty in DeviceType::ALL {
            for unique_id in unique_ids {
                let id = make_device_id(ty, unique_id);
                assert_eq!(crack_device_id(id.as_str()), (ty, unique_id));
            }
        }
    }

    #[test]
    fn test_crack_dcim() {
        let (ty, unique_id) = crack_device_id("dcim:ABC123");
        assert_eq!(ty, DeviceType::RemovableMassStorageWithDcim);
        assert_eq!(unique_id, "ABC123");
    }

    #[test]
    fn test_crack_keeps_colons_in_unique_id() {
        let (ty, unique_id) = crack_device_id("nodcim:UUID:1234-ABCD");
        assert_eq!(ty, DeviceType::RemovableMassStorageNoDcim);
        assert_eq!(unique_id, "UUID:1234-ABCD");
    }

    #[test]
    fn test_crack_empty_unique_id() {
        assert_eq!(crack_device_id("mtp:"), (DeviceType::MtpOrPtp, ""));
    }

    #[test]
    #[should_panic(expected = "malformed device id")]
    fn test_crack_garbage_panics() {
        crack_device_id("garbage-no-colon-prefix");
    }

    #[test]
    #[should_panic(expected = "malformed device id")]
    fn test_crack_unknown_prefix_panics() {
        crack_device_id("usb:1234");
    }

    #[test]
    #[should_panic(expected = "must not be empty")]
    fn test_make_empty_unique_id_panics() {
        make_device_id(DeviceType::MtpOrPtp, "");
    }

    #[test]
    fn test_classification() {
        assert!(is_media_device("mtp:XYZ"));
        assert!(is_media_device("dcim:ID1"));
        assert!(!is_media_device("nodcim:ID1"));
        assert!(!is_media_device("path:/mnt/usb"));

        assert!(!is_removable_device("path:/mnt/usb"));
        assert!(is_removable_device("nodcim:ID1"));
        assert!(is_removable_device("mtp:ID1"));

        assert!(!is_mass_storage_device("mtp:ID1"));
        assert!(is_mass_storage_device("dcim:ID1"));
        assert!(is_mass_storage_device("path:/"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_matches!(
            DeviceId::parse("no-prefix"),
            Err(Error::MalformedDeviceId { device_id }) if device_id == "no-prefix"
        );
        assert_matches!("DCIM:upper".parse::<DeviceId>(), Err(Error::MalformedDeviceId { .. }));

        let id: DeviceId = "mtp:phone".parse().unwrap();
        assert_eq!(id.device_type(), DeviceType::MtpOrPtp);
        assert_eq!(id.unique_id(), "phone");
        assert!(id.is_media());
        assert!(id.is_removable());
        assert!(!id.is_mass_storage());
    }

    #[test]
    fn test_serde_as_plain_string() {
        let id = make_device_id(DeviceType::RemovableMassStorageWithDcim, "UUID:42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"dcim:UUID:42\"");

        let back: DeviceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<DeviceId>("\"bogus\"").is_err());
    }

    #[test]
    fn test_device_type_display() {
        assert_eq!(DeviceType::RemovableMassStorageWithDcim.to_string(), "dcim");
        assert_eq!(DeviceType::RemovableMassStorageNoDcim.to_string(), "nodcim");
        assert_eq!(DeviceType::FixedMassStorage.to_string(), "path");
        assert_eq!(DeviceType::MtpOrPtp.to_string(), "mtp");
    }
}
