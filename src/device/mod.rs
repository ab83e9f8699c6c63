//! Device Module
//!
//! Device identifiers and the records that describe attached storage.

pub mod id;
pub mod info;

pub use id::*;
pub use info::*;
