//! Storage Module
//!
//! Attachment checks and path-to-device resolution on top of a device
//! registry.

pub mod probe;
pub mod util;

pub use probe::*;
pub use util::*;
