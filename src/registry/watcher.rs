//! Mount Watcher
//!
//! Periodically refreshes a [`MountTableRegistry`] on the blocking pool so
//! subscribers see attach/detach events without polling themselves.

use super::MountTableRegistry;
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Background refresher for a mount-table registry
#[derive(Debug)]
pub struct MountWatcher {
    registry: Arc<MountTableRegistry>,
    interval: Duration,
    cancel: CancellationToken,
}

impl MountWatcher {
    /// Watch `registry` at its configured poll interval
    pub fn new(registry: Arc<MountTableRegistry>) -> Result<Self> {
        registry.config().validate()?;
        let interval = registry.config().poll_interval();
        Self::with_interval(registry, interval)
    }

    /// Watch `registry` at an explicit interval, which must be non-zero
    pub fn with_interval(registry: Arc<MountTableRegistry>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::Configuration(
                "mount watcher interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            registry,
            interval,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops the watcher when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the watcher on the current runtime
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    /// Refresh until cancelled or a non-transient error occurs
    pub async fn run(self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Mount watcher started (interval {:?})", self.interval);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let registry = self.registry.clone();
            let outcome = tokio::task::spawn_blocking(move || registry.refresh())
                .await
                .map_err(|e| Error::Internal(format!("Mount refresh task failed: {}", e)))?;

            match outcome {
                Ok(events) if !events.is_empty() => {
                    debug!("Mount refresh produced {} events", events.len());
                }
                Ok(_) => {}
                Err(e) if e.is_transient() => {
                    warn!("Mount refresh failed, will retry: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        info!("Mount watcher stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaStorageConfig;
    use crate::registry::DeviceRegistry;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, MediaStorageConfig) {
        let dir = TempDir::new().unwrap();
        let config = MediaStorageConfig {
            mounts_path: dir.path().join("mounts"),
            sysfs_path: dir.path().join("sys"),
            disk_by_uuid_path: dir.path().join("by-uuid"),
            disk_by_label_path: dir.path().join("by-label"),
            ..Default::default()
        };
        let node = config.sysfs_path.join("class/block/sdz");
        fs::create_dir_all(&node).unwrap();
        fs::write(node.join("removable"), "1").unwrap();
        fs::write(&config.mounts_path, "").unwrap();
        (dir, config)
    }

    #[tokio::test]
    async fn test_watcher_publishes_attach() {
        let (dir, config) = fixture();
        let mount_point = dir.path().join("stick");
        fs::create_dir_all(&mount_point).unwrap();

        let registry = Arc::new(MountTableRegistry::new(config.clone()));
        let mut events = registry.subscribe();
        let watcher = MountWatcher::with_interval(registry.clone(), Duration::from_millis(10)).unwrap();
        let cancel = watcher.cancellation_token();
        let handle = watcher.spawn();

        fs::write(
            &config.mounts_path,
            format!("/dev/sdz {} vfat rw 0 0\n", mount_point.display()),
        )
        .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(event.is_attach());
        assert_eq!(event.device_id().as_str(), "nodcim:DEV:sdz");

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[test]
    fn test_zero_interval_rejected() {
        let (_dir, config) = fixture();
        let registry = Arc::new(MountTableRegistry::new(config.clone()));
        assert_matches!(
            MountWatcher::with_interval(registry, Duration::ZERO),
            Err(Error::Configuration(_))
        );

        let registry = Arc::new(MountTableRegistry::new(MediaStorageConfig {
            poll_interval_secs: 0,
            ..config
        }));
        assert_matches!(MountWatcher::new(registry), Err(Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_watcher_survives_missing_mount_table() {
        let (_dir, config) = fixture();
        fs::remove_file(&config.mounts_path).unwrap();

        let registry = Arc::new(MountTableRegistry::new(config));
        let watcher = MountWatcher::with_interval(registry, Duration::from_millis(5)).unwrap();
        let cancel = watcher.cancellation_token();
        let handle = watcher.spawn();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.is_finished());

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
