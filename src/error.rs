//! Error types for media storage utilities
//!
//! Malformed identifiers coming from trusted code are invariant violations
//! and panic at the call site. The variants here cover untrusted input,
//! registry bookkeeping, configuration and platform I/O.

use thiserror::Error;

/// Unified error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    // =========================================================================
    // Device Identifier Errors
    // =========================================================================
    #[error("Malformed device id: {device_id}")]
    MalformedDeviceId { device_id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // =========================================================================
    // Device Registry Errors
    // =========================================================================
    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    #[error("Device already attached: {device_id}")]
    DeviceAlreadyAttached { device_id: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is transient.
    ///
    /// Mount tables and sysfs can be briefly unreadable while devices come
    /// and go, so a poller should keep going after these.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_transient() {
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "mounts"));
        assert!(io.is_transient());

        let config_err = Error::Configuration("invalid".into());
        assert!(!config_err.is_transient());

        let malformed = Error::MalformedDeviceId {
            device_id: "garbage".into(),
        };
        assert!(!malformed.is_transient());

        let missing = Error::DeviceNotFound {
            device_id: "mtp:usb:2,5".into(),
        };
        assert!(!missing.is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = Error::DeviceAlreadyAttached {
            device_id: "dcim:UUID:1234".into(),
        };
        assert_eq!(err.to_string(), "Device already attached: dcim:UUID:1234");
    }
}
