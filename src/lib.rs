pub mod alarm;
pub mod alerter;
pub mod client;
pub mod config;
pub mod notify;
pub mod poller;
pub mod registry;
pub mod store;

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One measurement of a device's CPU utilization.
///
/// A sample is produced once per device per polling round. An absent
/// `cpu_percent` means the query failed (timeout, transport error,
/// unparsable response) and is a first-class outcome: the alerter maps
/// it to the UNKNOWN status instead of treating it as an error.
///
/// The same shape is persisted as the per-device snapshot document
/// (`latest/<ip>.json`) and mirrored into the history ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp_utc: DateTime<Utc>,
    pub ip: IpAddr,
    pub cpu_percent: Option<i64>,
}

impl Sample {
    /// Filesystem-safe key for this sample's device.
    pub fn file_stem(&self) -> String {
        safe_name(&self.ip.to_string())
    }
}

/// Replace path-hostile characters in a device address so it can be
/// used as a file name.
pub fn safe_name(address: &str) -> String {
    address.replace([':', '/'], "_")
}
