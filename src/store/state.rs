//! Per-device alarm state persistence
//!
//! Exclusive to the alerter. A document that is missing or fails to
//! parse reads as "no state yet": the alerter then initializes a fresh
//! OK/inactive state rather than refusing to evaluate the device.

use std::net::IpAddr;
use std::path::PathBuf;

use tokio::fs;
use tracing::warn;

use crate::alarm::AlarmState;
use crate::safe_name;

use super::atomic;
use super::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the state directory. Called once at startup; failure here
    /// is fatal for the daemon.
    pub async fn ensure_dir(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    fn path_for(&self, ip: IpAddr) -> PathBuf {
        self.dir.join(format!("{}.json", safe_name(&ip.to_string())))
    }

    /// Load the device's alarm state, `None` when absent or corrupt.
    pub async fn load(&self, ip: IpAddr) -> StoreResult<Option<AlarmState>> {
        match atomic::read_json(&self.path_for(ip)).await {
            Ok(state) => Ok(state),
            Err(StoreError::Serialization(msg)) => {
                warn!("ip={ip} discarding unparsable state document: {msg}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Atomically replace the device's alarm state.
    pub async fn save(&self, state: &AlarmState) -> StoreResult<()> {
        atomic::write_json(&self.path_for(state.ip), state).await
    }
}
