//! Device registry loading
//!
//! The registry is a JSON list of monitoring targets. It is loaded once
//! at startup; there is no hot-reload. Loading fails loudly when the
//! file is malformed or contains no usable devices, since a poller
//! without targets is a misconfiguration rather than a steady state.

use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;
use tracing::trace;

/// One monitoring target. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub ip: IpAddr,
    pub cpu_oid: String,
    pub site: Option<String>,
}

/// On-disk shape of a registry entry; `cpu_oid` falls back to the
/// configured default during resolution.
#[derive(Debug, Clone, Deserialize)]
struct RawDevice {
    ip: IpAddr,
    cpu_oid: Option<String>,
    site: Option<String>,
}

pub fn load_devices(path: &Path, default_cpu_oid: &str) -> anyhow::Result<Vec<Device>> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read device registry {}", path.display()))?;

    let raw: Vec<RawDevice> = serde_json::from_str(&file_content)
        .with_context(|| format!("device registry {} must be a JSON list", path.display()))?;

    let devices: Vec<Device> = raw
        .into_iter()
        .map(|entry| Device {
            ip: entry.ip,
            cpu_oid: entry
                .cpu_oid
                .filter(|oid| !oid.is_empty())
                .unwrap_or_else(|| default_cpu_oid.to_string()),
            site: entry.site.filter(|site| !site.is_empty()),
        })
        .collect();

    if devices.is_empty() {
        bail!("no devices in registry {}", path.display());
    }

    trace!("loaded {} devices from {}", devices.len(), path.display());
    Ok(devices)
}
