//! Atomic JSON document replacement
//!
//! Documents are written to `<path>.tmp` and then renamed over the
//! target. Rename is atomic on POSIX filesystems, so a concurrent
//! reader sees either the previous complete document or the new one,
//! never a partial write.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;

use super::error::StoreResult;

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Replace the document at `path` with `payload`, creating parent
/// directories as needed.
pub async fn write_json<T: Serialize>(path: &Path, payload: &T) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let body = serde_json::to_vec_pretty(payload)?;
    let tmp = tmp_path(path);
    fs::write(&tmp, &body).await?;
    fs::rename(&tmp, path).await?;

    Ok(())
}

/// Read a JSON document; `Ok(None)` when the file does not exist.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let body = match fs::read(path).await {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(Some(serde_json::from_slice(&body)?))
}
