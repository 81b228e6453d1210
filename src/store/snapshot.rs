//! Per-device latest-sample snapshots
//!
//! One JSON document per device, keyed by address and wholly replaced
//! every round. The poller is the only writer; the alerter only
//! enumerates and reads.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::{Sample, safe_name};

use super::atomic;
use super::error::StoreResult;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the snapshot directory. Called once at startup; failure
    /// here is fatal for the daemon.
    pub async fn ensure_dir(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Verify the snapshot directory exists and is readable without
    /// creating it. The poller owns creation; the alerter only checks,
    /// and treats an inaccessible directory as fatal at startup.
    pub async fn require_dir(&self) -> StoreResult<()> {
        fs::read_dir(&self.dir).await?;
        Ok(())
    }

    pub fn path_for(&self, address: &str) -> PathBuf {
        self.dir.join(format!("{}.json", safe_name(address)))
    }

    /// Atomically replace the device's snapshot with this sample.
    pub async fn write(&self, sample: &Sample) -> StoreResult<()> {
        let path = self.dir.join(format!("{}.json", sample.file_stem()));
        atomic::write_json(&path, sample).await
    }

    pub async fn read(&self, path: &Path) -> StoreResult<Option<Sample>> {
        atomic::read_json(path).await
    }

    /// All current snapshot documents, sorted by file name for a
    /// deterministic scan order.
    pub async fn list(&self) -> StoreResult<Vec<PathBuf>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut paths = vec![];

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }
}
