//! Append-only CPU history ledger
//!
//! A single growing CSV file mirroring every sample ever taken. The
//! header row is written once when the file is new; absent values
//! become empty fields. Nothing in this subsystem ever rewrites or
//! truncates the ledger.

use std::path::PathBuf;

use chrono::SecondsFormat;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::Sample;

use super::error::StoreResult;

const HEADER: &str = "timestamp_utc,ip,cpu_percent\n";

#[derive(Debug, Clone)]
pub struct HistoryLedger {
    path: PathBuf,
}

impl HistoryLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn append(&self, sample: &Sample) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let new_file = !fs::try_exists(&self.path).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut row = String::new();
        if new_file {
            row.push_str(HEADER);
        }

        let cpu = sample
            .cpu_percent
            .map(|value| value.to_string())
            .unwrap_or_default();
        row.push_str(&format!(
            "{},{},{}\n",
            sample.timestamp_utc.to_rfc3339_opts(SecondsFormat::Secs, true),
            sample.ip,
            cpu
        ));

        file.write_all(row.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
