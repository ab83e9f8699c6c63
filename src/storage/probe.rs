//! Path Probes
//!
//! Existence checks for fixed-storage device ids. The check may hit a slow
//! or hung filesystem, so it never runs on the caller's executor thread.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Asynchronous filesystem existence check
#[async_trait]
pub trait PathProbe: Send + Sync {
    /// Whether `path` exists; errors read as absent
    async fn exists(&self, path: PathBuf) -> bool;
}

/// Probe backed by the real filesystem, run on tokio's blocking pool
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPathProbe;

#[async_trait]
impl PathProbe for FsPathProbe {
    async fn exists(&self, path: PathBuf) -> bool {
        match tokio::fs::try_exists(&path).await {
            Ok(exists) => {
                debug!("Probed {:?}: exists={}", path, exists);
                exists
            }
            Err(e) => {
                warn!("Probe of {:?} failed: {}", path, e);
                false
            }
        }
    }
}
